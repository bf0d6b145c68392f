//! Frame sampling over a bounded time window
//!
//! The whole window is enumerable up front: `ceil((end-start)/interval)`
//! timestamps in strictly increasing order, first at `start`. The decoder is
//! a black-box producer of decodable frames; transient network trouble during
//! decode is retried, anything else aborts the job.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use railbird_common::{retry, RetryPolicy};
use tokio::process::Command;

use super::PipelineError;

/// Single sampled frame. Immutable; discarded after cropping.
#[derive(Clone)]
pub struct Frame {
    /// Ordinal within the sampled window (0-based)
    pub index: usize,
    /// Position within the video, in seconds
    pub timestamp_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: DynamicImage,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("timestamp_seconds", &self.timestamp_seconds)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Timestamps for a sampling window: `ceil((end-start)/interval)` entries,
/// strictly increasing, first at `start` inclusive.
pub fn sample_plan(start_time: f64, end_time: f64, interval_seconds: f64) -> Vec<f64> {
    let duration = end_time - start_time;
    if duration <= 0.0 || interval_seconds <= 0.0 {
        return Vec::new();
    }
    let count = (duration / interval_seconds).ceil() as usize;
    (0..count)
        .map(|i| start_time + i as f64 * interval_seconds)
        .collect()
}

/// Black-box frame producer. Implementations decode one frame at a given
/// timestamp, scaled to the requested dimensions.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn frame_at(
        &self,
        source: &str,
        timestamp_seconds: f64,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, PipelineError>;
}

/// Decoder shelling out to ffmpeg: seek, scale, emit one PNG on stdout.
pub struct FfmpegDecoder {
    ffmpeg_path: String,
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }

    pub fn with_path(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    fn classify_failure(stderr: &str) -> PipelineError {
        let lower = stderr.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            PipelineError::Timeout(truncate(stderr))
        } else if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("temporary failure")
        {
            PipelineError::Network(truncate(stderr))
        } else {
            PipelineError::Decode(truncate(stderr))
        }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cap ffmpeg stderr for error messages, cutting on a char boundary.
fn truncate(s: &str) -> String {
    const MAX: usize = 500;
    if s.len() <= MAX {
        return s.to_string();
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    async fn frame_at(
        &self,
        source: &str,
        timestamp_seconds: f64,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, PipelineError> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-ss")
            .arg(format!("{:.3}", timestamp_seconds))
            .arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg("-vf")
            .arg(format!("scale={}:{}", width, height))
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("png")
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PipelineError::Decode(format!("Failed to spawn ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(&stderr));
        }

        if output.stdout.is_empty() {
            return Err(PipelineError::Decode(format!(
                "ffmpeg produced no frame at {:.3}s",
                timestamp_seconds
            )));
        }

        image::load_from_memory(&output.stdout)
            .map_err(|e| PipelineError::Decode(format!("Failed to decode frame image: {}", e)))
    }
}

/// Drives a sampling plan through the decoder with per-frame retry.
pub struct FrameSampler {
    decoder: Arc<dyn FrameDecoder>,
    retry_policy: RetryPolicy,
}

impl FrameSampler {
    pub fn new(decoder: Arc<dyn FrameDecoder>, retry_policy: RetryPolicy) -> Self {
        Self {
            decoder,
            retry_policy,
        }
    }

    /// Sample frames at `interval_seconds` over `[start_time, end_time)`,
    /// scaled to `width`x`height`, in strictly increasing timestamp order.
    pub async fn sample(
        &self,
        source: &str,
        start_time: f64,
        end_time: f64,
        interval_seconds: f64,
        width: u32,
        height: u32,
    ) -> Result<Vec<Frame>, PipelineError> {
        let plan = sample_plan(start_time, end_time, interval_seconds);
        let mut frames = Vec::with_capacity(plan.len());

        for (index, timestamp) in plan.into_iter().enumerate() {
            let pixels = retry::retry(
                "frame_decode",
                &self.retry_policy,
                PipelineError::is_transient_for_decode,
                || self.decoder.frame_at(source, timestamp, width, height),
            )
            .await?;

            tracing::debug!(
                index,
                timestamp_seconds = timestamp,
                "Sampled frame"
            );

            frames.push(Frame {
                index,
                timestamp_seconds: timestamp,
                width: pixels.width(),
                height: pixels.height(),
                pixels,
            });
        }

        Ok(frames)
    }
}
