//! OpenAI-compatible chat-completion client.
//!
//! Speaks the `/chat/completions` streaming protocol: one SSE message per
//! delta chunk, terminated by a literal `[DONE]` data line. The returned
//! token stream pulls lazily from the event source, so dropping it closes
//! the upstream connection and stops generation.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use log::debug;
use qanat_protocol::ChatMessage;
use reqwest_eventsource::{Event, EventSource};

use crate::models::ModelConfig;

use super::{EngineError, GenerationEngine, GenerationToken, TokenStream};

pub struct OpenAiEngine {
    client: reqwest::Client,
}

impl OpenAiEngine {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OpenAiEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationEngine for OpenAiEngine {
    async fn stream_chat(
        &self,
        model: &ModelConfig,
        messages: &[ChatMessage],
    ) -> Result<TokenStream, EngineError> {
        let url = format!(
            "{}/chat/completions",
            model.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": model.upstream_model,
            "messages": messages,
            "stream": true,
        });

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body);
        if let Some(key) = model.api_key() {
            request = request.bearer_auth(key);
        }

        let es = EventSource::new(request).map_err(|e| EngineError::Connect(e.to_string()))?;
        debug!("streaming {} from {url}", model.upstream_model);

        Ok(Box::pin(stream::try_unfold(es, |mut es| async move {
            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => continue,
                    Ok(Event::Message(msg)) => {
                        if msg.data.trim() == "[DONE]" {
                            es.close();
                            return Ok(None);
                        }
                        match parse_chunk(&msg.data) {
                            Some(token) => return Ok(Some((token, es))),
                            // Comments and unknown chunk shapes are skipped.
                            None => continue,
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => return Ok(None),
                    Err(err) => return Err(EngineError::Upstream(err.to_string())),
                }
            }
            Ok(None)
        })))
    }
}

/// Extract the delta fragments from one streaming chunk.
fn parse_chunk(data: &str) -> Option<GenerationToken> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    let delta = value.get("choices")?.get(0)?.get("delta")?;

    let content = delta
        .get("content")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let reasoning = delta
        .get("reasoning_content")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    if content.is_none() && reasoning.is_none() {
        return None;
    }
    Some(GenerationToken { content, reasoning })
}
