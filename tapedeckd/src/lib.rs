//! tapedeckd library - background playback daemon
//!
//! Long-lived loopback HTTP service owning the live pattern engine and the
//! in-memory PlaybackState. Launched lazily by the tapedeck CLI, located via
//! the daemon record, and shut down by the inactivity watchdog or a signal.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod engine;
pub mod state;
pub mod watchdog;

use engine::PatternEngine;
use state::SharedState;

/// Application context shared across HTTP handlers
#[derive(Clone)]
pub struct AppContext {
    /// Playback snapshot + inactivity clock
    pub state: Arc<SharedState>,
    /// Audio engine behind its capability interface
    pub engine: Arc<dyn PatternEngine>,
    /// This daemon's process id, reported by /health
    pub pid: u32,
}

impl AppContext {
    pub fn new(engine: Arc<dyn PatternEngine>) -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            engine,
            pid: std::process::id(),
        }
    }
}

/// Build the control protocol router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(api::handlers::health))
        .route("/current", get(api::handlers::current))
        .route("/play", post(api::handlers::play))
        .route("/stop", post(api::handlers::stop))
        .route("/pause", post(api::handlers::pause))
        .route("/evaluate", post(api::handlers::evaluate))
        .route("/validate", post(api::handlers::validate))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
}
