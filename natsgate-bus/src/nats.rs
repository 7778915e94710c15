//! NATS-backed bus client.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{BusError, Result};
use crate::traits::{BusClient, BusConnector, BusSubscription};

/// Default time allowed for the initial connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens [`NatsBusClient`] handles.
#[derive(Debug, Clone)]
pub struct NatsConnector {
    connect_timeout: Duration,
}

impl NatsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for NatsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusConnector for NatsConnector {
    async fn connect(&self, address: &str) -> Result<Arc<dyn BusClient>> {
        let client = ConnectOptions::new()
            .connection_timeout(self.connect_timeout)
            .connect(address)
            .await
            .map_err(|e| BusError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        info!(address, "connected to NATS");
        Ok(Arc::new(NatsBusClient::new(client)))
    }
}

/// One NATS connection.
///
/// The connection is released on [`BusClient::close`]; calls made after
/// that fail with [`BusError::Closed`].
pub struct NatsBusClient {
    client: Mutex<Option<Client>>,
}

impl NatsBusClient {
    pub fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    fn client(&self) -> Result<Client> {
        self.client.lock().clone().ok_or(BusError::Closed)
    }
}

#[async_trait]
impl BusClient for NatsBusClient {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client()?
            .publish(topic.to_string(), payload)
            .await
            .map_err(|e| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, topic: &str) -> Result<BusSubscription> {
        let subscriber = self
            .client()?
            .subscribe(topic.to_string())
            .await
            .map_err(|e| BusError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        debug!(topic, "subscribed to NATS subject");
        Ok(Box::pin(subscriber.map(|message| message.payload)))
    }

    async fn close(&self) -> Result<()> {
        let Some(client) = self.client.lock().take() else {
            return Ok(());
        };
        // Dropping the last handle closes the connection once pending
        // publishes are flushed.
        client
            .flush()
            .await
            .map_err(|e| BusError::Flush(e.to_string()))
    }
}
