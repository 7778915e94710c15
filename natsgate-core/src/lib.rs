//! natsgate-core: sessions, the session registry and login authentication
//!
//! This crate holds everything the gateway needs that does not depend on a
//! transport or a message bus:
//!
//! - **Sessions** - [`Session`] wraps one client connection behind a
//!   [`FrameSink`] and tracks its identity and activity
//! - **Registry** - [`SessionRegistry`] indexes live sessions by id, user
//!   and device, and performs login binding and device eviction atomically
//! - **Authentication** - [`Authenticator`] with a JWKS-backed
//!   [`JwtValidator`] and a fixed-table [`StaticAuthenticator`]
//! - **Device policy** - [`DeviceIdPolicy`] decides which sessions count as
//!   the same device
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SessionRegistry                │
//! │  by_id ──► Session ◄── by_device             │
//! │              ▲                               │
//! │  by_user ────┘ (user → device → session)     │
//! └──────────────────────────────────────────────┘
//!          Session ──► FrameSink (transport)
//! ```

pub mod auth;
pub mod device;
pub mod error;
pub mod session;

pub use auth::{
    AuthConfig, AuthError, Authenticator, BEARER_PREFIX, JwtValidator, StaticAuthenticator,
    TokenClaims, parse_bearer,
};
pub use device::{DeviceIdPolicy, UNKNOWN_DEVICE};
pub use error::{CoreError, SessionError};
pub use session::{
    CloseReason, DeviceId, FrameSink, Identity, OutboundFrame, RecordingSink, RegistryStats,
    SentFrames, Session, SessionId, SessionRegistry, SessionStatus, UserId,
};
