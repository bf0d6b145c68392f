//! railbird-hx - Hand extraction service
//!
//! Turns a window of poker broadcast video into structured hand histories:
//! samples frames, crops the configured screen regions, sends them to a
//! vision endpoint for reconstruction, validates the result, and serves
//! job state over HTTP with SSE progress streaming.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use railbird_common::config::HxConfig;
use railbird_common::events::EventBus;
use railbird_hx::pipeline::reconstruct::VisionClient;
use railbird_hx::pipeline::sampler::FfmpegDecoder;
use railbird_hx::AppState;

#[derive(Debug, Parser)]
#[command(name = "railbird-hx", version, about = "Poker hand extraction service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override (e.g. 0.0.0.0:5731)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("railbird_hx=info,railbird_common=info")),
        )
        .init();

    info!("Starting railbird-hx (hand extraction) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = HxConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    let config = Arc::new(config);
    info!(
        vision_endpoint = %config.vision.endpoint_url,
        max_duration_seconds = config.pipeline.max_duration_seconds,
        max_concurrent_jobs = config.jobs.max_concurrent_jobs,
        "Configuration loaded"
    );

    let event_bus = EventBus::new(256);

    let decoder = Arc::new(FfmpegDecoder::new());
    let reconstructor = Arc::new(
        VisionClient::new(&config.vision)
            .map_err(|e| anyhow::anyhow!("Failed to build vision client: {}", e))?,
    );

    let state = AppState::new(Arc::clone(&config), event_bus, decoder, reconstructor);

    state.registry.spawn_sweeper(
        config.jobs.retention_seconds,
        Duration::from_secs(config.jobs.sweep_interval_seconds),
    );

    let app = railbird_hx::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
