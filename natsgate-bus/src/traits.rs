//! Core traits for bus clients.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Stream of raw payloads delivered on one topic.
///
/// Dropping the stream ends the subscription.
pub type BusSubscription = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// A handle to the message bus.
///
/// Handles are shared: many subscriptions and publishers may use one
/// handle at the same time.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Publish a payload to a topic.
    async fn publish(&self, topic: &str, payload: Bytes) -> crate::Result<()>;

    /// Subscribe to a topic.
    async fn subscribe(&self, topic: &str) -> crate::Result<BusSubscription>;

    /// Flush and release the underlying connection.
    async fn close(&self) -> crate::Result<()>;
}

/// Opens bus handles for an address.
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// Establish a new, independent handle.
    async fn connect(&self, address: &str) -> crate::Result<Arc<dyn BusClient>>;
}
