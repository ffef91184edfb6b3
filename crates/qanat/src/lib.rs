//! qanat - streaming chat relay server.
//!
//! The two load-bearing pieces live in [`ws`] (the connection hub with
//! bounded fan-out and slow-consumer eviction) and [`relay`] (the cancellable
//! token-to-SSE relay). Everything else is the plumbing around them: the
//! generation engine seam, the model registry, and the HTTP surface.

pub mod api;
pub mod config;
pub mod engine;
pub mod models;
pub mod prompt;
pub mod relay;
pub mod ws;
