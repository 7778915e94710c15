//! Shared application state for the gateway server

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::gateway::Gateway;

/// State shared by the HTTP and websocket handlers
#[derive(Clone)]
pub struct AppState {
    /// The session dispatcher
    pub gateway: Arc<Gateway>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
