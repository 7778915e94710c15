//! In-memory bus for testing.
//!
//! Every topic is a broadcast channel inside a shared hub. Clients
//! connected to the same [`MemoryBus`] see each other's messages, which
//! lets tests run the full gateway without a NATS server.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BusError, Result};
use crate::traits::{BusClient, BusConnector, BusSubscription};

/// Messages buffered per topic before slow subscribers start lagging.
const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// Shared in-process hub of topics.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<Hub>,
}

struct Hub {
    topics: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
    capacity: usize,
    connections: AtomicUsize,
}

impl MemoryBus {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Create a hub with a custom per-topic buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Hub {
                topics: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Open a client without going through an address.
    #[must_use]
    pub fn client(&self) -> MemoryBusClient {
        self.inner.connections.fetch_add(1, Ordering::SeqCst);
        MemoryBusClient {
            hub: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Publish directly into the hub; returns how many subscribers saw it.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> usize {
        self.inner.publish(topic, payload.into())
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of clients opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    fn sender(&self, topic: &str) -> broadcast::Sender<Bytes> {
        self.topics
            .lock()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn publish(&self, topic: &str, payload: Bytes) -> usize {
        // No subscribers is not an error; the message is simply dropped.
        self.sender(topic).send(payload).unwrap_or(0)
    }
}

#[async_trait]
impl BusConnector for MemoryBus {
    async fn connect(&self, address: &str) -> Result<Arc<dyn BusClient>> {
        debug!(address, "opening in-memory bus client");
        Ok(Arc::new(self.client()))
    }
}

/// A client handle on a [`MemoryBus`].
pub struct MemoryBusClient {
    hub: Arc<Hub>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl MemoryBusClient {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl BusClient for MemoryBusClient {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.hub.publish(topic, payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BusSubscription> {
        self.ensure_open()?;
        let topic_name = topic.to_string();
        let stream = BroadcastStream::new(self.hub.sender(topic).subscribe());

        let payloads = tokio_stream::StreamExt::filter_map(stream, move |item| match item {
            Ok(payload) => Some(payload),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(topic = %topic_name, skipped, "memory bus subscriber lagged");
                None
            }
        });

        // Subscriptions end when their client is closed
        let bounded = futures::StreamExt::take_until(payloads, self.shutdown.clone().cancelled_owned());
        Ok(Box::pin(bounded))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shutdown.cancel();
            self.hub.connections.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
