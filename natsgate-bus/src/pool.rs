//! Fixed-size pool of shared bus handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::error::{BusError, Result};
use crate::memory::MemoryBus;
use crate::nats::NatsConnector;
use crate::traits::{BusClient, BusConnector};

/// Address scheme served by an isolated in-process [`MemoryBus`].
pub const MEMORY_SCHEME: &str = "memory://";

/// A fixed set of bus handles created eagerly and leased round-robin.
///
/// A lease is a shared reference, not exclusive ownership; any number of
/// subscriptions may run over one handle.
pub struct BusClientPool {
    address: String,
    clients: Vec<Arc<dyn BusClient>>,
    next: AtomicUsize,
    drained: AtomicBool,
}

impl BusClientPool {
    /// Establish `size` independent handles to `address`.
    ///
    /// Fails on the first handle that cannot connect, after closing the
    /// ones already opened.
    pub async fn create(connector: &dyn BusConnector, address: &str, size: usize) -> Result<Self> {
        let mut clients: Vec<Arc<dyn BusClient>> = Vec::with_capacity(size);
        for _ in 0..size {
            match connector.connect(address).await {
                Ok(client) => clients.push(client),
                Err(e) => {
                    for client in &clients {
                        if let Err(close_err) = client.close().await {
                            warn!(address, error = %close_err, "failed to close bus client");
                        }
                    }
                    return Err(e);
                }
            }
        }
        info!(address, size, "bus client pool created");

        Ok(Self {
            address: address.to_string(),
            clients,
            next: AtomicUsize::new(0),
            drained: AtomicBool::new(false),
        })
    }

    /// Create a pool choosing the connector from the address scheme.
    ///
    /// `memory://` gets a private in-process hub; anything else is NATS.
    pub async fn connect(address: &str, size: usize) -> Result<Self> {
        let connector: Box<dyn BusConnector> = if address.starts_with(MEMORY_SCHEME) {
            Box::new(MemoryBus::new())
        } else {
            Box::new(NatsConnector::new())
        };
        Self::create(connector.as_ref(), address, size).await
    }

    /// Hand out the next handle.
    pub fn lease(&self) -> Result<Arc<dyn BusClient>> {
        if self.drained.load(Ordering::SeqCst) {
            return Err(BusError::PoolDrained);
        }
        if self.clients.is_empty() {
            return Err(BusError::PoolEmpty);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        Ok(Arc::clone(&self.clients[index]))
    }

    /// Close every handle. Only the first call does anything.
    pub async fn drain(&self) {
        if self.drained.swap(true, Ordering::SeqCst) {
            return;
        }
        for client in &self.clients {
            if let Err(e) = client.close().await {
                warn!(address = %self.address, error = %e, "failed to close bus client");
            }
        }
        info!(address = %self.address, size = self.clients.len(), "bus client pool drained");
    }

    pub fn size(&self) -> usize {
        self.clients.len()
    }

    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::SeqCst)
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}
