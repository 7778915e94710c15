//! Server error types

use natsgate_bus::BusError;
use thiserror::Error;

/// Errors that can occur starting or running the gateway
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The bus pool could not be created
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// Configuration that cannot be served
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The server was started twice
    #[error("server already started")]
    AlreadyStarted,

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
