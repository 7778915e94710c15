//! WebSocket transport for the gateway

mod connection;
mod sink;

pub use connection::ws_handler;
pub use sink::WsSink;
