//! Unauthenticated-session reaper
//!
//! Runs on every accept rather than on a timer. Once more sessions than
//! allowed are waiting to log in, every unauthenticated session older than
//! the timeout is closed with a policy-violation reason.

use std::time::Duration;

use natsgate_core::{CloseReason, SessionRegistry};
use tokio::time::Instant;
use tracing::info;

use crate::config::GatewayConfig;

#[derive(Debug, Clone, Copy)]
pub struct Reaper {
    max_unauthenticated: usize,
    timeout: Duration,
}

impl Reaper {
    pub fn new(max_unauthenticated: usize, timeout: Duration) -> Self {
        Self {
            max_unauthenticated,
            timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.max_unauthenticated_sessions,
            config.unauthenticated_timeout,
        )
    }

    /// Sweep if the unauthenticated count is over the ceiling
    ///
    /// Age is measured from the session's start, not its last activity: a
    /// chatty client that never logs in is still reaped. Returns how many
    /// sessions were closed.
    pub async fn run(&self, registry: &SessionRegistry) -> usize {
        let waiting = registry.stats().unauthenticated;
        if waiting <= self.max_unauthenticated {
            return 0;
        }

        let now = Instant::now();
        let timeout = self.timeout;
        let reaped = registry
            .sweep_unauthenticated(
                |session| session.age(now) > timeout,
                |session| async move { session.close(CloseReason::Auth).await },
            )
            .await;

        if reaped > 0 {
            info!(reaped, waiting, "reaped unauthenticated sessions");
        }
        reaped
    }
}
