//! Sessions and the session registry

pub mod mock;
pub mod outbound;
pub mod registry;
pub mod state;
pub mod types;

// Re-export key types for convenience
pub use mock::{RecordingSink, SentFrames};
pub use outbound::{CloseReason, FrameSink, OutboundFrame};
pub use registry::{RegistryStats, SessionRegistry};
pub use state::Session;
pub use types::{DeviceId, Identity, SessionId, SessionStatus, UserId};
