//! natsgate-server - websocket gateway from authenticated clients to bus topics
//!
//! This crate owns the [`Gateway`] dispatcher and serves it over axum: a
//! websocket upgrade at the configured path and a health endpoint. Sessions
//! log in with a bearer token and subscribe to allow-listed topics; bus
//! messages are forwarded back verbatim.

mod bridge;
pub mod config;
mod error;
pub mod gateway;
pub mod http;
pub mod protocol;
pub mod reaper;
mod state;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use natsgate_bus::{BusClientPool, BusConnector};
use natsgate_core::{Authenticator, CloseReason, JwtValidator};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use config::{DeviceIdSource, GatewayConfig};
pub use error::ServerError;
pub use gateway::{Flow, Gateway};
pub use http::create_router;
pub use protocol::InboundFrame;
pub use state::AppState;

/// The gateway server
///
/// Construct, optionally swap in an authenticator or bus connector, then
/// [`start`](Self::start). [`stop`](Self::stop) may be called from another
/// task at any time and more than once.
pub struct GatewayServer {
    config: GatewayConfig,
    authenticator: Option<Arc<dyn Authenticator>>,
    connector: Option<Arc<dyn BusConnector>>,
    gateway: Mutex<Option<Arc<Gateway>>>,
    started: AtomicBool,
    shutdown: CancellationToken,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            authenticator: None,
            connector: None,
            gateway: Mutex::new(None),
            started: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `authenticator` instead of a JWKS validator built from the config
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Open bus handles through `connector` instead of picking one by scheme
    #[must_use]
    pub fn with_bus_connector(mut self, connector: Arc<dyn BusConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Get the server configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The running gateway, once started
    pub fn gateway(&self) -> Option<Arc<Gateway>> {
        self.gateway.lock().clone()
    }

    /// Create the bus pool, bind the configured address and serve until stopped
    pub async fn start(&self) -> Result<(), ServerError> {
        self.config.validate()?;
        let addr = self.config.listen_address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Serve on an already bound listener until stopped
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        self.config.validate()?;

        let authenticator = self.authenticator()?;
        let pool = self.create_pool().await?;
        let gateway = Arc::new(Gateway::new(&self.config, Arc::new(pool), authenticator));
        *self.gateway.lock() = Some(Arc::clone(&gateway));

        let state = Arc::new(AppState::new(gateway));
        let router = create_router(state, &self.config.url_path);

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!(
            address = %local_addr,
            path = %self.config.url_path,
            topics = self.config.topics.len(),
            "natsgate listening"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

        self.stop().await;
        Ok(())
    }

    /// Stop accepting, drain the bus pool and close every session
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let Some(gateway) = self.gateway() else {
            return;
        };
        gateway.pool().drain().await;
        let closed = gateway.close_all(CloseReason::Normal).await;
        if closed > 0 {
            tracing::info!(closed, "closed sessions on shutdown");
        }
    }

    fn authenticator(&self) -> Result<Arc<dyn Authenticator>, ServerError> {
        if let Some(authenticator) = &self.authenticator {
            return Ok(Arc::clone(authenticator));
        }
        let auth_config = self.config.auth_config();
        if !auth_config.is_valid() {
            return Err(ServerError::InvalidConfig(
                "jwks_url is required".to_string(),
            ));
        }
        Ok(Arc::new(JwtValidator::new(auth_config)))
    }

    async fn create_pool(&self) -> Result<BusClientPool, ServerError> {
        let address = &self.config.bus_address;
        let size = self.config.bus_pool_size;
        let pool = match &self.connector {
            Some(connector) => BusClientPool::create(connector.as_ref(), address, size).await?,
            None => BusClientPool::connect(address, size).await?,
        };
        Ok(pool)
    }
}
