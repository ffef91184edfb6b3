//! Per-connection read and write pumps.
//!
//! Every accepted WebSocket runs two tasks: the read pump forwards inbound
//! frames into the hub's broadcast path, the write pump drains the outbound
//! queue onto the socket. The shutdown handshake converges both on a single
//! transport closure: a read-side exit unregisters the connection, which
//! closes the queue, which lets the write pump flush, send a Close frame, and
//! finish; a write-side failure aborts the read pump directly.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use log::{debug, warn};
use qanat_protocol::MAX_INBOUND_FRAME_BYTES;
use tokio::sync::mpsc;

use crate::api::AppState;

use super::hub::{ConnectionHub, ConnectionId};

/// `GET /ws` - upgrade and hand the socket to the broadcast domain.
///
/// The upgrade is accepted unconditionally; origin policy is a deployment
/// concern, not enforced here.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>) {
    let (id, outbound) = hub.register().await;
    let (sink, stream) = socket.split();

    let mut write_task = tokio::spawn(write_pump(id, outbound, sink));
    let mut read_task = tokio::spawn(read_pump(id, stream, hub.clone()));

    tokio::select! {
        _ = &mut write_task => {
            // The write side died first (transport error, or the hub evicted
            // us and the Close frame went out). Tear the read side down too.
            read_task.abort();
            let _ = read_task.await;
        }
        _ = &mut read_task => {
            // Read side finished: orderly close, read error, or protocol
            // violation. Closing the queue lets the write pump flush what is
            // left, send a Close frame, and exit on its own.
            hub.unregister(id).await;
            let _ = write_task.await;
        }
    }

    hub.unregister(id).await;
    debug!("connection {id} torn down");
}

/// What the read pump does with one inbound message.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Broadcast(String),
    Ignore,
    Teardown,
}

fn classify_inbound(msg: Message) -> Inbound {
    match msg {
        Message::Text(text) => {
            if text.len() > MAX_INBOUND_FRAME_BYTES {
                warn!(
                    "inbound frame of {} bytes exceeds the {} byte limit",
                    text.len(),
                    MAX_INBOUND_FRAME_BYTES
                );
                Inbound::Teardown
            } else {
                Inbound::Broadcast(text.to_string())
            }
        }
        // The broadcast protocol is text-only.
        Message::Binary(_) => Inbound::Teardown,
        Message::Close(_) => Inbound::Teardown,
        // Ping/pong are handled by the protocol stack.
        Message::Ping(_) | Message::Pong(_) => Inbound::Ignore,
    }
}

async fn read_pump<S>(id: ConnectionId, mut stream: S, hub: Arc<ConnectionHub>)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(msg) => match classify_inbound(msg) {
                // Fire-and-forget: the pump does not wait for delivery.
                Inbound::Broadcast(payload) => hub.broadcast(&payload).await,
                Inbound::Ignore => {}
                Inbound::Teardown => {
                    debug!("connection {id}: read pump closing");
                    return;
                }
            },
            Err(err) => {
                debug!("connection {id}: read error: {err}");
                return;
            }
        }
    }
}

async fn write_pump(
    id: ConnectionId,
    mut outbound: mpsc::Receiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    while let Some(payload) = outbound.recv().await {
        if let Err(err) = sink.send(Message::Text(payload.into())).await {
            // A failed write means a dead transport; no retry.
            debug!("connection {id}: write error: {err}");
            return;
        }
    }

    // The hub closed the queue: orderly shutdown, Close frame first.
    let _ = sink.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_within_limit_is_broadcast() {
        let action = classify_inbound(Message::Text("hello".into()));
        assert_eq!(action, Inbound::Broadcast("hello".to_string()));
    }

    #[test]
    fn oversized_text_tears_the_connection_down() {
        let oversized = "x".repeat(MAX_INBOUND_FRAME_BYTES + 1);
        assert_eq!(classify_inbound(Message::Text(oversized.into())), Inbound::Teardown);
    }

    #[test]
    fn text_at_exactly_the_limit_is_allowed() {
        let max = "y".repeat(MAX_INBOUND_FRAME_BYTES);
        assert_eq!(
            classify_inbound(Message::Text(max.clone().into())),
            Inbound::Broadcast(max)
        );
    }

    #[test]
    fn binary_frames_are_a_protocol_violation() {
        assert_eq!(
            classify_inbound(Message::Binary(vec![1, 2, 3].into())),
            Inbound::Teardown
        );
    }

    #[test]
    fn pings_are_ignored() {
        assert_eq!(classify_inbound(Message::Ping(vec![].into())), Inbound::Ignore);
    }

    #[tokio::test]
    async fn sender_receives_its_own_broadcast() {
        let hub = Arc::new(ConnectionHub::new());
        let (id, mut rx) = hub.register().await;

        // The connection's own inbound frames come back through its queue:
        // the hub has no concept of a sending connection.
        let inbound = futures::stream::iter(vec![Ok::<_, axum::Error>(Message::Text(
            "hello".into(),
        ))]);
        read_pump(id, inbound, hub.clone()).await;

        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert!(rx.try_recv().is_err(), "payload delivered more than once");
    }
}
