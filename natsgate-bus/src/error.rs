//! Error types for bus clients and the pool.

/// Error type for bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus endpoint could not be reached.
    #[error("failed to connect to bus at {address}: {reason}")]
    Connect { address: String, reason: String },

    /// A subscription could not be installed.
    #[error("failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// A payload could not be published.
    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// Pending messages could not be flushed on close.
    #[error("failed to flush bus client: {0}")]
    Flush(String),

    /// The client has been closed.
    #[error("bus client is closed")]
    Closed,

    /// The pool was drained during shutdown.
    #[error("bus client pool has been drained")]
    PoolDrained,

    /// The pool holds no clients.
    #[error("bus client pool is empty")]
    PoolEmpty,
}

/// Result type alias for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_names_address() {
        let err = BusError::Connect {
            address: "nats://10.0.0.1:4222".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to connect to bus at nats://10.0.0.1:4222: connection refused"
        );
    }

    #[test]
    fn pool_errors_display() {
        assert_eq!(BusError::PoolDrained.to_string(), "bus client pool has been drained");
        assert_eq!(BusError::PoolEmpty.to_string(), "bus client pool is empty");
    }
}
