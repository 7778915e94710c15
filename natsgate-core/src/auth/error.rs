//! Authentication error types

use thiserror::Error;

/// Errors that can occur during login authentication
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login payload did not carry a `Bearer ` token
    #[error("missing bearer token")]
    MissingBearer,

    /// The token format is invalid (not a valid JWT)
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    /// The token was signed with an algorithm other than RS256
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token has expired
    #[error("token has expired")]
    Expired,

    /// The token was rejected without a more specific cause
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The key ID in the token doesn't match any known keys
    #[error("unknown key ID: {0}")]
    UnknownKeyId(String),

    /// Failed to fetch the key set
    #[error("failed to fetch JWKS: {0}")]
    JwksFetchError(String),

    /// Neither a user id nor a display name claim was present
    #[error("token carries no user identity")]
    MissingIdentity,

    /// JWT decoding error from jsonwebtoken crate
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}
