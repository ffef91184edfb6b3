//! Generation engine seam.
//!
//! The relay only ever sees a pull-based, lazy stream of tokens. Dropping the
//! stream is the cancellation signal: implementations must stop producing and
//! release upstream resources when that happens.

mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use qanat_protocol::ChatMessage;
use thiserror::Error;

use crate::models::ModelConfig;

pub use openai::OpenAiEngine;

/// One incremental unit of generation. Either fragment may be absent; the
/// relay defaults them to empty strings on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationToken {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to reach generation engine: {0}")]
    Connect(String),

    #[error("generation stream error: {0}")]
    Upstream(String),
}

/// Lazy sequence of tokens ending with `None` (normal completion) or an
/// error item (upstream failure). Dropping it cancels generation.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<GenerationToken, EngineError>> + Send>>;

/// A chat-completion backend that yields tokens incrementally.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    async fn stream_chat(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> Result<TokenStream, EngineError>;
}
