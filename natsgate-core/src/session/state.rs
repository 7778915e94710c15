//! A single client session
//!
//! Three independent lock domains live here and in the registry:
//! - `data` (identity and timestamps), a short synchronous lock
//! - `outbound` (the send gate), held across one whole frame write
//! - the registry's index lock, which may read `data` but never the reverse

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::outbound::{CloseReason, FrameSink, OutboundFrame};
use super::types::{Identity, SessionId, SessionStatus};
use crate::error::SessionError;

/// Longest a close may wait on the send gate and the transport
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

struct SessionData {
    identity: Option<Identity>,
    last_activity: Instant,
}

/// One client connection and its authentication state
pub struct Session {
    id: SessionId,
    peer_addr: Option<SocketAddr>,
    connected_at: DateTime<Utc>,
    started_at: Instant,
    data: RwLock<SessionData>,
    outbound: Mutex<Box<dyn FrameSink>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl Session {
    /// Create an unauthenticated session writing to `sink`
    pub fn new(id: SessionId, sink: Box<dyn FrameSink>) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr: None,
            connected_at: Utc::now(),
            started_at: now,
            data: RwLock::new(SessionData {
                identity: None,
                last_activity: now,
            }),
            outbound: Mutex::new(sink),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Record the transport peer address
    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Wall-clock accept time, for reporting only
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn identity(&self) -> Option<Identity> {
        self.data.read().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.read().identity.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_closed() {
            SessionStatus::Closed
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }

    /// Monotonic accept time; never changes, readable without locking
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn last_activity(&self) -> Instant {
        self.data.read().last_activity
    }

    /// Time since the session was accepted
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Mark inbound activity
    pub fn touch(&self) {
        self.data.write().last_activity = Instant::now();
    }

    /// Bind the resolved identity; a session authenticates at most once
    pub fn set_identity(&self, identity: Identity) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        let mut data = self.data.write();
        if data.identity.is_some() {
            return Err(SessionError::AlreadyAuthenticated(self.id));
        }
        data.identity = Some(identity);
        Ok(())
    }

    /// Token cancelled when the session closes
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Send one text frame, serialized against every other sender
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        let mut sink = self.outbound.lock().await;
        // re-check: a close may have won the gate while we waited
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        sink.send_frame(OutboundFrame::Text(text.into())).await
    }

    /// Send a close frame and tear the transport down
    ///
    /// Idempotent. Does not touch the registry; callers remove the session
    /// themselves. A read loop blocked on the same socket observes the
    /// resulting close or error and exits on its own.
    ///
    /// Waiting on the send gate and the transport is bounded by
    /// [`CLOSE_TIMEOUT`]; a peer that stopped reading is abandoned without a
    /// close frame.
    pub async fn close(&self, reason: CloseReason) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.cancel();

        let teardown = async {
            let mut sink = self.outbound.lock().await;
            if let Err(e) = sink.send_frame(OutboundFrame::Close(reason)).await {
                debug!(session_id = %self.id, "close frame not delivered: {}", e);
            }
            if let Err(e) = sink.close().await {
                debug!(session_id = %self.id, "transport close failed: {}", e);
            }
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, teardown).await.is_err() {
            warn!(
                session_id = %self.id,
                reason = reason.reason(),
                "close timed out, peer is not reading"
            );
            return;
        }
        debug!(session_id = %self.id, reason = reason.reason(), "session closed");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("identity", &self.identity())
            .field("closed", &self.is_closed())
            .finish()
    }
}
