//! Login authentication: bearer parsing, token claims and JWT validation

mod authenticator;
mod claims;
mod config;
mod error;
mod validator;

pub use authenticator::{Authenticator, StaticAuthenticator};
pub use claims::{BEARER_PREFIX, TokenClaims, parse_bearer};
pub use config::AuthConfig;
pub use error::AuthError;
pub use validator::JwtValidator;
