//! Message bus access for natsgate.
//!
//! The gateway only needs to subscribe to topics and forward raw payloads,
//! so the bus is abstracted behind two small traits and a pool.
//!
//! # Key Types
//!
//! - [`BusClient`] - Trait for publishing to and subscribing on topics
//! - [`BusConnector`] - Trait for opening new client handles
//! - [`BusClientPool`] - Fixed set of handles leased round-robin
//! - [`NatsConnector`] - NATS implementation via `async-nats`
//! - [`MemoryBus`] - In-process hub for tests and local runs

pub mod error;
pub mod memory;
pub mod nats;
pub mod pool;
pub mod traits;

// Re-exports
pub use error::{BusError, Result};
pub use memory::{MemoryBus, MemoryBusClient};
pub use nats::{NatsBusClient, NatsConnector};
pub use pool::{BusClientPool, MEMORY_SCHEME};
pub use traits::{BusClient, BusConnector, BusSubscription};
