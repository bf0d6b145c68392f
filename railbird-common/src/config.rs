//! Configuration loading for the extraction service
//!
//! Resolution priority:
//! 1. Environment variables (highest)
//! 2. TOML config file
//! 3. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extraction service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HxConfig {
    /// HTTP bind address
    pub bind_address: String,

    /// Vision endpoint settings
    pub vision: VisionConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,

    /// Job lifecycle settings
    pub jobs: JobConfig,
}

/// External vision/LLM endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Endpoint URL for hand reconstruction requests
    pub endpoint_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Model identifier included in each request
    pub model: String,
    /// Per-call timeout in seconds
    pub request_timeout_seconds: u64,
    /// Retry attempts for a single reconstruction call
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds (doubles per attempt)
    pub retry_initial_delay_ms: u64,
}

/// Frame sampling and cropping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard cap on requested window duration in seconds
    pub max_duration_seconds: f64,
    /// Length of one processing segment in seconds
    pub segment_seconds: f64,
    /// Default sampling interval in seconds
    pub frame_interval_seconds: f64,
    /// Width frames are scaled to before cropping
    pub frame_width: u32,
    /// Height frames are scaled to before cropping
    pub frame_height: u32,
    /// Retry attempts for a single frame decode
    pub decode_max_retries: u32,
}

/// Job registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Terminal and stale jobs are dropped after this many seconds
    pub retention_seconds: u64,
    /// How often the TTL sweep runs, in seconds
    pub sweep_interval_seconds: u64,
    /// Maximum jobs executing concurrently across the process
    pub max_concurrent_jobs: usize,
}

impl Default for HxConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5731".to_string(),
            vision: VisionConfig::default(),
            pipeline: PipelineConfig::default(),
            jobs: JobConfig::default(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://127.0.0.1:8600/v1/reconstruct".to_string(),
            api_key: String::new(),
            model: "vision-default".to_string(),
            request_timeout_seconds: 120,
            max_retries: 3,
            retry_initial_delay_ms: 2000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_duration_seconds: 300.0,
            segment_seconds: 30.0,
            frame_interval_seconds: 2.0,
            frame_width: 1280,
            frame_height: 720,
            decode_max_retries: 3,
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            retention_seconds: 3600,
            sweep_interval_seconds: 60,
            max_concurrent_jobs: 4,
        }
    }
}

impl HxConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Failed to parse {}: {}", p.display(), e)))?
            }
            Some(p) => {
                tracing::warn!(path = %p.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables override file values
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("RAILBIRD_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Ok(url) = std::env::var("RAILBIRD_VISION_URL") {
            self.vision.endpoint_url = url;
        }
        if let Ok(key) = std::env::var("RAILBIRD_VISION_API_KEY") {
            self.vision.api_key = key;
        }
        if let Ok(model) = std::env::var("RAILBIRD_VISION_MODEL") {
            self.vision.model = model;
        }
        if let Ok(v) = std::env::var("RAILBIRD_MAX_DURATION_SECONDS") {
            if let Ok(parsed) = v.parse() {
                self.pipeline.max_duration_seconds = parsed;
            }
        }
        if let Ok(v) = std::env::var("RAILBIRD_MAX_CONCURRENT_JOBS") {
            if let Ok(parsed) = v.parse() {
                self.jobs.max_concurrent_jobs = parsed;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.max_duration_seconds <= 0.0 {
            return Err(Error::Config(
                "pipeline.max_duration_seconds must be positive".to_string(),
            ));
        }
        if self.pipeline.segment_seconds <= 0.0 {
            return Err(Error::Config(
                "pipeline.segment_seconds must be positive".to_string(),
            ));
        }
        if self.pipeline.frame_interval_seconds <= 0.0 {
            return Err(Error::Config(
                "pipeline.frame_interval_seconds must be positive".to_string(),
            ));
        }
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(Error::Config(
                "jobs.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
