//! REST API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Users with at least one authenticated session
    pub users: usize,
    /// Devices holding an authenticated session
    pub devices: usize,
    /// Sessions waiting to log in
    pub unauthenticated: usize,
}

/// Health check endpoint
///
/// Returns server status, uptime and the registry counters.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.gateway.stats();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        users: stats.users,
        devices: stats.devices,
        unauthenticated: stats.unauthenticated,
    })
}
