use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::StreamExt;
use log::{debug, info};
use qanat_protocol::{ChatRequest, StreamFrame};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::prompt;
use crate::relay::StreamRelay;

use super::error::ApiResult;
use super::state::AppState;

/// Buffer between the relay and the SSE body. Small on purpose: frames are
/// flushed as they arrive, and a gone client closes the channel, which the
/// relay observes even while it is still waiting on upstream.
const FRAME_BUFFER_SIZE: usize = 32;

/// `POST /api/ai/chat` - stream a chat completion as server-sent events.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let model = state.models.resolve(req.model.as_deref().unwrap_or(""))?;
    info!("chat request for model {}", model.id);

    let messages = prompt::build_messages(&req.messages);
    let tokens = state.engine.stream_chat(model, &messages).await?;

    let (tx, rx) = mpsc::channel::<StreamFrame>(FRAME_BUFFER_SIZE);
    let relay = StreamRelay::new(model.id.clone(), CancellationToken::new());
    tokio::spawn(async move {
        let outcome = relay.run(tokens, tx).await;
        debug!("chat session ended: {outcome:?}");
    });

    let stream = ReceiverStream::new(rx)
        .map(|frame| Ok::<_, Infallible>(Event::default().data(frame.sse_data())));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `GET /healthz`
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
