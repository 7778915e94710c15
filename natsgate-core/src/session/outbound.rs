//! Outbound frame types and the transport sink abstraction
//!
//! The gateway never writes to a socket directly. Each session owns one
//! [`FrameSink`] behind its send gate; the websocket transport and the
//! test recorder both implement it.

use async_trait::async_trait;

use crate::error::SessionError;

/// Why a session was closed, with its websocket close code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Orderly shutdown
    Normal,
    /// Never authenticated within the allowed time
    Auth,
    /// Replaced by a newer login on the same device
    OneConnectionPerDevice,
    /// Transport failure or internal error
    ServerError,
    /// Frame exceeded the pre-login size limit
    FrameTooLarge,
}

impl CloseReason {
    /// RFC 6455 close code
    pub fn code(self) -> u16 {
        match self {
            CloseReason::Normal => 1000,
            CloseReason::OneConnectionPerDevice => 1001,
            CloseReason::Auth => 1008,
            CloseReason::FrameTooLarge => 1009,
            CloseReason::ServerError => 1011,
        }
    }

    /// Short human-readable reason sent in the close frame
    pub fn reason(self) -> &'static str {
        match self {
            CloseReason::Normal => "",
            CloseReason::Auth => "Auth",
            CloseReason::OneConnectionPerDevice => "OneConnectionPerDevice",
            CloseReason::ServerError => "ServerError",
            CloseReason::FrameTooLarge => "FrameTooLarge",
        }
    }
}

/// A frame written to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close(CloseReason),
}

impl OutboundFrame {
    pub fn text(value: impl Into<String>) -> Self {
        OutboundFrame::Text(value.into())
    }
}

/// Write half of a client transport
///
/// Implementations are driven by exactly one writer at a time; the
/// session's send gate provides that exclusion.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one whole frame
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SessionError>;

    /// Tear down the transport
    async fn close(&mut self) -> Result<(), SessionError>;
}
