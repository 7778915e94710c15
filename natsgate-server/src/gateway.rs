//! Session dispatcher
//!
//! [`Gateway`] owns the registry, the bus pool and the authenticator and
//! drives each session through `Unauthenticated -> Authenticated -> Closed`.
//! It never touches a socket: transports hand it a [`FrameSink`] on accept
//! and feed it [`InboundFrame`]s from their read loop.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use natsgate_bus::{BusClientPool, BusError, BusSubscription};
use natsgate_core::{
    AuthError, Authenticator, CloseReason, DeviceIdPolicy, FrameSink, Identity, RegistryStats,
    Session, SessionError, SessionId, SessionRegistry, parse_bearer,
};
use tracing::{debug, error, info, trace, warn};

use crate::bridge;
use crate::config::GatewayConfig;
use crate::protocol::{
    BINARY_NOT_SUPPORTED, Command, GO_AWAY, INVALID_TOPIC, InboundFrame, NOT_AUTHORIZED, OK,
    PONG, TOPIC_UNAVAILABLE,
};
use crate::reaper::Reaper;

/// Whether a read loop should keep reading after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Gateway {
    registry: Arc<SessionRegistry>,
    pool: Arc<BusClientPool>,
    authenticator: Arc<dyn Authenticator>,
    device_policy: DeviceIdPolicy,
    topics: HashSet<String>,
    reaper: Reaper,
    max_unauthenticated_frame_bytes: usize,
    max_frame_bytes: usize,
    next_id: AtomicU64,
}

impl Gateway {
    pub fn new(
        config: &GatewayConfig,
        pool: Arc<BusClientPool>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            pool,
            authenticator,
            device_policy: config.device_policy(),
            topics: config.topics.iter().cloned().collect(),
            reaper: Reaper::from_config(config),
            max_unauthenticated_frame_bytes: config.max_unauthenticated_frame_bytes,
            max_frame_bytes: config.max_frame_bytes,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<BusClientPool> {
        &self.pool
    }

    /// Transport read cap for every frame and message
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Register a new connection as an unauthenticated session
    ///
    /// Runs the reaper before returning, so an accept may close other
    /// sessions that never logged in.
    pub async fn accept(&self, sink: Box<dyn FrameSink>, peer: Option<SocketAddr>) -> Arc<Session> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut session = Session::new(id, sink);
        if let Some(peer) = peer {
            session = session.with_peer_addr(peer);
        }
        let session = Arc::new(session);

        self.registry.register(Arc::clone(&session));
        debug!(session_id = %id, peer = ?peer, "session accepted");

        self.reaper.run(&self.registry).await;
        session
    }

    /// Handle one inbound frame
    pub async fn handle_frame(&self, session: &Arc<Session>, frame: InboundFrame) -> Flow {
        if session.is_closed() {
            self.registry.remove(session);
            return Flow::Stop;
        }

        match frame {
            InboundFrame::Close => {
                debug!(session_id = %session.id(), "client closed connection");
                self.on_close(session, CloseReason::Normal).await;
                Flow::Stop
            }
            InboundFrame::Text(text) => {
                if self.too_large(session, text.len()) {
                    return self.reject_oversized(session, text.len()).await;
                }
                session.touch();
                self.dispatch(session, &text).await
            }
            InboundFrame::Binary(data) => {
                if self.too_large(session, data.len()) {
                    return self.reject_oversized(session, data.len()).await;
                }
                session.touch();
                self.reply(session, BINARY_NOT_SUPPORTED).await
            }
        }
    }

    /// Close a session and drop it from the registry; both steps are idempotent
    pub async fn on_close(&self, session: &Session, reason: CloseReason) {
        session.close(reason).await;
        if self.registry.remove(session) {
            debug!(session_id = %session.id(), reason = ?reason, "session removed");
        }
    }

    /// Close every live session, returning how many were closed
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        self.registry
            .sweep(
                |_| true,
                move |session| async move { session.close(reason).await },
            )
            .await
    }

    fn too_large(&self, session: &Session, len: usize) -> bool {
        len > self.max_unauthenticated_frame_bytes && !session.is_authenticated()
    }

    async fn reject_oversized(&self, session: &Session, len: usize) -> Flow {
        warn!(
            session_id = %session.id(),
            size = len,
            limit = self.max_unauthenticated_frame_bytes,
            "frame too large before login"
        );
        self.on_close(session, CloseReason::FrameTooLarge).await;
        Flow::Stop
    }

    async fn dispatch(&self, session: &Arc<Session>, text: &str) -> Flow {
        match Command::parse(text) {
            Command::Ping => self.reply(session, PONG).await,
            Command::Login(credential) => self.login(session, credential).await,
            Command::Subscribe(topic) => self.subscribe(session, topic).await,
            Command::Unknown => {
                trace!(session_id = %session.id(), "ignoring unknown command");
                Flow::Continue
            }
        }
    }

    async fn login(&self, session: &Arc<Session>, credential: &str) -> Flow {
        let identity = match self.authenticate(session, credential).await {
            Ok(identity) => identity,
            Err(e) => {
                info!(session_id = %session.id(), error = %e, "login rejected");
                return self.reply(session, NOT_AUTHORIZED).await;
            }
        };

        if let Some(current) = session.identity() {
            if current == identity {
                return self.reply(session, OK).await;
            }
            warn!(
                session_id = %session.id(),
                user_id = %current.user_id,
                attempted_user_id = %identity.user_id,
                "login with a different identity on an authenticated session"
            );
            return self.reply(session, GO_AWAY).await;
        }

        if let Err(e) = session.set_identity(identity.clone()) {
            return match e {
                SessionError::AlreadyAuthenticated(_) => self.reply(session, GO_AWAY).await,
                _ => {
                    debug!(session_id = %session.id(), error = %e, "session closed during login");
                    Flow::Stop
                }
            };
        }

        match self.registry.bind_identity(session) {
            Ok(Some(evicted)) => {
                info!(
                    session_id = %session.id(),
                    evicted_session_id = %evicted.id(),
                    device_id = %identity.device_id,
                    "replacing session on device"
                );
                evicted.close(CloseReason::OneConnectionPerDevice).await;
                self.registry.remove(&evicted);
            }
            Ok(None) => {}
            Err(e) => {
                // reaped while the token was being validated
                debug!(session_id = %session.id(), error = %e, "session left the registry during login");
                session.close(CloseReason::Auth).await;
                return Flow::Stop;
            }
        }

        info!(
            session_id = %session.id(),
            user_id = %identity.user_id,
            device_id = %identity.device_id,
            "login succeeded"
        );
        self.reply(session, OK).await
    }

    async fn authenticate(&self, session: &Session, credential: &str) -> Result<Identity, AuthError> {
        let token = parse_bearer(credential)?;
        let claims = self.authenticator.authenticate(token).await?;
        let user_id = claims.resolve_user_id()?;
        let device_id = self.device_policy.resolve(&claims, session.peer_addr());
        Ok(Identity { user_id, device_id })
    }

    async fn subscribe(&self, session: &Arc<Session>, topic: &str) -> Flow {
        if !session.is_authenticated() {
            return self.reply(session, GO_AWAY).await;
        }
        if !self.topics.contains(topic) {
            debug!(session_id = %session.id(), topic, "topic not allowed");
            return self.reply(session, INVALID_TOPIC).await;
        }

        match self.open_subscription(topic).await {
            Ok(subscription) => {
                info!(session_id = %session.id(), topic, "subscribed");
                bridge::spawn_forward(Arc::clone(session), topic.to_string(), subscription);
                Flow::Continue
            }
            Err(e) => {
                error!(session_id = %session.id(), topic, error = %e, "subscribe failed");
                self.reply(session, TOPIC_UNAVAILABLE).await
            }
        }
    }

    async fn open_subscription(&self, topic: &str) -> Result<BusSubscription, BusError> {
        let client = self.pool.lease()?;
        client.subscribe(topic).await
    }

    async fn reply(&self, session: &Session, text: &str) -> Flow {
        match session.send_text(text).await {
            Ok(()) => Flow::Continue,
            Err(e) => {
                debug!(session_id = %session.id(), error = %e, "reply failed");
                self.on_close(session, CloseReason::ServerError).await;
                Flow::Stop
            }
        }
    }
}
