//! Stream relay: pull-based token source in, ordered push frames out.
//!
//! One relay instance serves exactly one chat session. It races the next
//! upstream token against a cancellation signal, emits one frame per token
//! with a contiguous 0-based sequence index, and ends the session with
//! exactly one terminal frame - or nothing at all when cancelled.

use futures::StreamExt;
use log::debug;
use qanat_protocol::StreamFrame;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::TokenStream;

/// How a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished normally; the `[DONE]` sentinel was emitted.
    Completed,
    /// Upstream failed; exactly one error frame was emitted.
    Failed,
    /// The caller aborted or the client went away; nothing further was
    /// emitted and the upstream handle was released.
    Cancelled,
}

pub struct StreamRelay {
    model: String,
    cancel: CancellationToken,
}

impl StreamRelay {
    pub fn new(model: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            model: model.into(),
            cancel,
        }
    }

    /// Drain `tokens` into `frames` until the session ends.
    ///
    /// Consumes the relay: a session is not reusable. Returning drops the
    /// token stream, which is what signals the engine to stop producing; the
    /// cancellation branches are listed first and the select is biased, so an
    /// observed cancellation stops upstream pulls within one scheduling step.
    /// A closed frame channel means the receiving side is gone and counts as
    /// cancellation too, even while upstream has no token ready.
    pub async fn run(self, mut tokens: TokenStream, frames: mpsc::Sender<StreamFrame>) -> RelayOutcome {
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("relay cancelled after {seq} frames");
                    return RelayOutcome::Cancelled;
                }

                _ = frames.closed() => {
                    debug!("relay client gone after {seq} frames");
                    return RelayOutcome::Cancelled;
                }

                next = tokens.next() => match next {
                    Some(Ok(token)) => {
                        let frame =
                            StreamFrame::delta(token.content, token.reasoning, seq, &self.model);
                        if frames.send(frame).await.is_err() {
                            debug!("relay client gone after {seq} frames");
                            return RelayOutcome::Cancelled;
                        }
                        seq += 1;
                    }
                    Some(Err(err)) => {
                        // Best effort: the client may already be gone.
                        let _ = frames.send(StreamFrame::error(err.to_string())).await;
                        return RelayOutcome::Failed;
                    }
                    None => {
                        let _ = frames.send(StreamFrame::Done).await;
                        return RelayOutcome::Completed;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    use futures::Stream;
    use futures::stream;
    use qanat_protocol::ChatChunk;

    use crate::engine::{EngineError, GenerationToken};

    use super::*;

    fn token(content: &str) -> Result<GenerationToken, EngineError> {
        Ok(GenerationToken {
            content: Some(content.to_string()),
            reasoning: None,
        })
    }

    /// Wraps a token stream and records when it is dropped, i.e. when the
    /// relay released its upstream handle.
    struct DropTracker {
        inner: TokenStream,
        released: Arc<AtomicBool>,
    }

    impl Stream for DropTracker {
        type Item = Result<GenerationToken, EngineError>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.inner.as_mut().poll_next(cx)
        }
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn assert_delta(frame: &StreamFrame, content: &str, seq: u64) -> ChatChunk {
        match frame {
            StreamFrame::Delta(chunk) => {
                assert_eq!(chunk.choices[0].delta.content, content);
                assert_eq!(chunk.created, seq);
                chunk.clone()
            }
            other => panic!("expected delta frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn emits_ordered_frames_then_done() {
        let tokens: TokenStream = Box::pin(stream::iter(vec![token("Hello"), token(" world")]));
        let relay = StreamRelay::new("ai-assistant", CancellationToken::new());
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = relay.run(tokens, tx).await;
        assert_eq!(outcome, RelayOutcome::Completed);

        let first = rx.recv().await.unwrap();
        let chunk = assert_delta(&first, "Hello", 0);
        assert_eq!(chunk.model, "ai-assistant");
        assert_delta(&rx.recv().await.unwrap(), " world", 1);
        assert_eq!(rx.recv().await, Some(StreamFrame::Done));
        assert_eq!(rx.recv().await, None, "no frames after the terminal one");
    }

    #[tokio::test]
    async fn upstream_error_yields_exactly_one_terminal_error_frame() {
        let tokens: TokenStream = Box::pin(stream::iter(vec![
            token("partial"),
            Err(EngineError::Upstream("connection reset".into())),
        ]));
        let relay = StreamRelay::new("m", CancellationToken::new());
        let (tx, mut rx) = mpsc::channel(8);

        let outcome = relay.run(tokens, tx).await;
        assert_eq!(outcome, RelayOutcome::Failed);

        assert_delta(&rx.recv().await.unwrap(), "partial", 0);
        match rx.recv().await.unwrap() {
            StreamFrame::Error { message } => assert!(message.contains("connection reset")),
            other => panic!("expected error frame, got {other:?}"),
        }
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn cancellation_is_silent_and_releases_upstream() {
        let released = Arc::new(AtomicBool::new(false));
        let tokens = DropTracker {
            inner: Box::pin(stream::pending::<Result<GenerationToken, EngineError>>()),
            released: released.clone(),
        };

        let cancel = CancellationToken::new();
        let relay = StreamRelay::new("m", cancel.clone());
        let (tx, mut rx) = mpsc::channel(8);

        let session = tokio::spawn(relay.run(Box::pin(tokens), tx));
        cancel.cancel();

        assert_eq!(session.await.unwrap(), RelayOutcome::Cancelled);
        assert!(released.load(Ordering::SeqCst), "upstream handle not released");
        assert_eq!(rx.recv().await, None, "cancellation must not emit frames");
    }

    #[tokio::test]
    async fn cancellation_mid_session_stops_further_frames() {
        let released = Arc::new(AtomicBool::new(false));
        let tokens = DropTracker {
            inner: Box::pin(stream::iter(vec![token("first")]).chain(stream::pending())),
            released: released.clone(),
        };

        let cancel = CancellationToken::new();
        let relay = StreamRelay::new("m", cancel.clone());
        let (tx, mut rx) = mpsc::channel(8);

        let session = tokio::spawn(relay.run(Box::pin(tokens), tx));

        // The one available token comes through...
        assert_delta(&rx.recv().await.unwrap(), "first", 0);

        // ...then cancellation ends the session with no frame at index >= 1.
        cancel.cancel();
        assert_eq!(session.await.unwrap(), RelayOutcome::Cancelled);
        assert_eq!(rx.recv().await, None);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn client_disconnect_mid_wait_cancels_promptly() {
        let released = Arc::new(AtomicBool::new(false));
        let tokens = DropTracker {
            inner: Box::pin(stream::pending::<Result<GenerationToken, EngineError>>()),
            released: released.clone(),
        };

        // Nobody ever cancels the token; the only disconnect signal is the
        // receiver going away while the relay is parked waiting for a token.
        let relay = StreamRelay::new("m", CancellationToken::new());
        let (tx, rx) = mpsc::channel(8);

        let session = tokio::spawn(relay.run(Box::pin(tokens), tx));
        drop(rx);

        assert_eq!(session.await.unwrap(), RelayOutcome::Cancelled);
        assert!(released.load(Ordering::SeqCst), "upstream handle not released");
    }

    #[tokio::test]
    async fn dropped_receiver_counts_as_cancellation() {
        let released = Arc::new(AtomicBool::new(false));
        let tokens = DropTracker {
            inner: Box::pin(stream::iter(vec![token("a"), token("b")]).chain(stream::pending())),
            released: released.clone(),
        };

        let relay = StreamRelay::new("m", CancellationToken::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = relay.run(Box::pin(tokens), tx).await;
        assert_eq!(outcome, RelayOutcome::Cancelled);
        assert!(released.load(Ordering::SeqCst));
    }
}
