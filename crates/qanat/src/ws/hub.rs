//! Connection hub: registry of active connections and broadcast fan-out.

use std::collections::HashMap;
use std::fmt;

use log::{debug, info};
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Capacity of each connection's outbound queue. A connection that falls this
/// far behind a broadcast burst is evicted rather than allowed to stall the
/// fan-out.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Opaque identity of one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry of active connections for one broadcast domain.
///
/// Register, unregister, and broadcast are linearized by the registry lock.
/// Broadcast enqueues are non-blocking (`try_send`), so holding the lock
/// across the fan-out loop is safe; a slow consumer can never stall the hub
/// or any other connection.
///
/// Each outbound queue has exactly one producer (the hub) and one consumer
/// (the connection's write pump). Dropping the sender closes the queue, which
/// the write pump observes as the end of the connection.
pub struct ConnectionHub {
    connections: Mutex<HashMap<ConnectionId, mpsc::Sender<String>>>,
    queue_capacity: usize,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::with_queue_capacity(OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            queue_capacity,
        }
    }

    /// Add a new connection to the registry.
    ///
    /// Creates the outbound queue and returns its receiving end together with
    /// the connection's identity. Called exactly once per connection
    /// lifecycle, by the upgrade handler.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = ConnectionId(Uuid::new_v4());

        let mut conns = self.connections.lock().await;
        conns.insert(id, tx);
        info!("client {id} connected, {} active", conns.len());

        (id, rx)
    }

    /// Remove a connection from the registry, closing its outbound queue.
    ///
    /// Idempotent: unregistering an absent or already-removed connection is a
    /// no-op. Removal drops the queue sender, so no further enqueue can
    /// target the connection once it is gone.
    pub async fn unregister(&self, id: ConnectionId) {
        let mut conns = self.connections.lock().await;
        if conns.remove(&id).is_some() {
            info!("client {id} disconnected, {} active", conns.len());
        }
    }

    /// Deliver a payload to every registered connection.
    ///
    /// Each enqueue is non-blocking. A connection whose queue is full or
    /// already closed is treated like a client-initiated disconnect: its
    /// queue is closed and it is dropped from the registry while delivery
    /// continues to the remaining connections.
    pub async fn broadcast(&self, payload: &str) {
        let mut conns = self.connections.lock().await;

        let mut evicted = Vec::new();
        for (id, tx) in conns.iter() {
            match tx.try_send(payload.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("client {id}: outbound queue full, evicting");
                    evicted.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("client {id}: outbound queue closed, evicting");
                    evicted.push(*id);
                }
            }
        }

        for id in evicted {
            conns.remove(&id);
            info!("evicted slow client {id}, {} active", conns.len());
        }
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
