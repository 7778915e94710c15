//! Shared test utilities for natsgate-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use natsgate_bus::MemoryBus;
use natsgate_core::{StaticAuthenticator, TokenClaims};
use natsgate_server::{GatewayConfig, GatewayServer};
use tokio::net::TcpListener;

#[allow(dead_code)]
pub const TOPIC_A: &str = "test.a";
#[allow(dead_code)]
pub const TOPIC_B: &str = "test.b";

/// A running server with its in-memory bus
#[allow(dead_code)]
pub struct TestGateway {
    pub server: Arc<GatewayServer>,
    pub bus: MemoryBus,
    pub addr: SocketAddr,
}

/// Config with the test topics allow-listed and one shared device id
#[allow(dead_code)]
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        url_path: "/ws".to_string(),
        bus_address: "memory://".to_string(),
        bus_pool_size: 2,
        topics: vec![TOPIC_A.to_string(), TOPIC_B.to_string()],
        remote_addr: "device-1".to_string(),
        ..GatewayConfig::default()
    }
}

/// Tokens accepted by every test server
///
/// Under the static policy the `deviceId` claims are ignored and every
/// login lands on `device-1`.
pub fn test_authenticator() -> StaticAuthenticator {
    StaticAuthenticator::new()
        .with_token(
            "alice-token",
            TokenClaims::for_user("alice").with_claim("deviceId", "alice-phone"),
        )
        .with_token(
            "bob-token",
            TokenClaims::for_user("bob").with_claim("deviceId", "bob-phone"),
        )
        .with_token(
            "alice-tablet-token",
            TokenClaims::for_user("alice").with_claim("deviceId", "tablet"),
        )
}

/// Creates a test server with the default test config
#[allow(dead_code)]
pub async fn create_test_server() -> TestGateway {
    create_test_server_with_config(test_config()).await
}

/// Creates a test server with custom config
#[allow(dead_code)]
pub async fn create_test_server_with_config(config: GatewayConfig) -> TestGateway {
    let bus = MemoryBus::new();
    let server = Arc::new(
        GatewayServer::new(config)
            .with_authenticator(Arc::new(test_authenticator()))
            .with_bus_connector(Arc::new(bus.clone())),
    );
    let addr = spawn_server(Arc::clone(&server)).await;

    TestGateway { server, bus, addr }
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: Arc<GatewayServer>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let running = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = running.run_with_listener(listener).await;
    });

    // Wait until the pool exists and the router is about to serve
    while server.gateway().is_none() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// Poll until `condition` holds, panicking after a second
#[allow(dead_code)]
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
