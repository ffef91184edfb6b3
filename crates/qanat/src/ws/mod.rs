//! WebSocket broadcast domain: connection hub and per-connection pumps.

mod connection;
mod hub;

pub use connection::ws_handler;
pub use hub::{ConnectionHub, ConnectionId, OUTBOUND_QUEUE_CAPACITY};
