//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::AppState;
use crate::ws::ws_handler;

pub use api::HealthResponse;

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/api/health";

/// Create the router: the health endpoint plus the websocket upgrade at `ws_path`
pub fn create_router(state: Arc<AppState>, ws_path: &str) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(api::health))
        .route(ws_path, get(ws_handler))
        .with_state(state)
}
