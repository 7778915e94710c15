//! Error types for natsgate-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::session::SessionId;

/// Top-level error type for natsgate-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Errors related to sessions and the registry
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session {0} is closed")]
    Closed(SessionId),

    #[error("Session {0} is already authenticated")]
    AlreadyAuthenticated(SessionId),

    #[error("Session {0} holds no identity")]
    MissingIdentity(SessionId),

    #[error("Session {0} is not registered")]
    NotRegistered(SessionId),

    #[error("Session {0} is already bound to an identity")]
    AlreadyBound(SessionId),

    #[error("Transport error: {0}")]
    Transport(String),
}
