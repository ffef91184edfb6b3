//! SSE stream frame encoding.
//!
//! The chat endpoint pushes OpenAI-style chunk objects, one per generation
//! token, followed by exactly one terminal frame: the `[DONE]` sentinel on
//! success or an `{"error": …}` object on upstream failure. A cancelled
//! session ends without a terminal frame.

use serde::{Deserialize, Serialize};

/// Incremental content carried by one chunk. Fragments the upstream omitted
/// are empty strings, never null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    pub content: String,
    pub reasoning_content: String,
}

/// A single choice inside a chunk. The relay serves one client per session,
/// so `index` is always 0 and `finish_reason` is always null (completion is
/// signalled by the `[DONE]` sentinel instead).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
    pub index: u32,
    pub finish_reason: Option<String>,
}

/// One non-terminal stream chunk.
///
/// `created` is the 0-based sequence index of the chunk within its session,
/// not a wall-clock timestamp; frames are self-ordering without a clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    pub choices: Vec<ChunkChoice>,
    pub created: u64,
    pub model: String,
}

/// A frame emitted by one relay session, totally ordered by sequence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta(ChatChunk),
    Done,
    Error { message: String },
}

impl StreamFrame {
    /// Build a non-terminal frame for one generation token.
    pub fn delta(
        content: Option<String>,
        reasoning: Option<String>,
        seq: u64,
        model: impl Into<String>,
    ) -> Self {
        Self::Delta(ChatChunk {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: content.unwrap_or_default(),
                    reasoning_content: reasoning.unwrap_or_default(),
                },
                index: 0,
                finish_reason: None,
            }],
            created: seq,
            model: model.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The payload of the `data:` line carrying this frame.
    pub fn sse_data(&self) -> String {
        match self {
            Self::Delta(chunk) => serde_json::json!(chunk).to_string(),
            Self::Done => "[DONE]".to_string(),
            Self::Error { message } => serde_json::json!({ "error": message }).to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta(_))
    }
}
