//! Wire-level types for the qanat server.
//!
//! These types define the two client-facing protocols: the JSON body of the
//! chat endpoint and the SSE frames it streams back, plus the limits of the
//! WebSocket broadcast protocol.

mod chat;
mod stream;

pub use chat::{ChatMessage, ChatRequest, Role};
pub use stream::{ChatChunk, ChunkChoice, ChunkDelta, StreamFrame};

/// Maximum size in bytes of one inbound WebSocket text frame. Anything larger
/// is a protocol violation and tears down the offending connection.
pub const MAX_INBOUND_FRAME_BYTES: usize = 512;
