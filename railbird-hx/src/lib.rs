//! railbird-hx library interface
//!
//! Exposes the extraction service's public APIs for integration testing.

pub mod api;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod validator;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use railbird_common::config::HxConfig;
use railbird_common::events::EventBus;

use crate::coordinator::JobCoordinator;
use crate::pipeline::reconstruct::HandReconstructor;
use crate::pipeline::sampler::FrameDecoder;
use crate::registry::JobRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: Arc<HxConfig>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// In-memory job store
    pub registry: JobRegistry,
    /// Job lifecycle owner
    pub coordinator: JobCoordinator,
}

impl AppState {
    /// Wire up shared state around the given pipeline collaborators. The
    /// decoder and reconstructor are injected so tests can run the full
    /// service without ffmpeg or a live vision endpoint.
    pub fn new(
        config: Arc<HxConfig>,
        event_bus: EventBus,
        decoder: Arc<dyn FrameDecoder>,
        reconstructor: Arc<dyn HandReconstructor>,
    ) -> Self {
        let registry = JobRegistry::new();
        let coordinator = JobCoordinator::new(
            Arc::clone(&config),
            registry.clone(),
            event_bus.clone(),
            decoder,
            reconstructor,
        );
        Self {
            config,
            event_bus,
            registry,
            coordinator,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    api::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
