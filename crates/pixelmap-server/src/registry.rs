//! Registry of open connections and the broadcast fan-out.

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use pixelmap_core::ServerMessage;
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Why a frame could not be queued for a connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,
    #[error("outbound buffer full")]
    Full,
}

/// Sending side of one connection.
///
/// Frames go into a bounded buffer drained by the connection's writer task.
/// Queueing never waits, so one stuck client cannot hold up the others.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    sender: mpsc::Sender<Message>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<Message>) -> Self {
        Self {
            sender,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Queue a frame without waiting.
    pub fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Serialize and queue a server message.
    pub fn send(&self, message: &ServerMessage) -> Result<(), crate::ServerError> {
        let json = message.to_json()?;
        self.deliver(Message::Text(json.into()))?;
        Ok(())
    }

    /// Ask the owning connection task to close.
    pub fn shut_down(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once [`shut_down`](Self::shut_down) has been called.
    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections that had already gone away.
    pub dropped: usize,
    /// Connections removed because their buffer was full.
    pub evicted: usize,
}

/// All connections currently open, keyed by connection id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ConnectionId, handle: ConnectionHandle) {
        self.connections.insert(id, handle);
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn deregister(&self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Deliver a message to every registered connection.
    ///
    /// Handles are copied out before fan-out, so registrations and removals
    /// during the loop never touch the map while it is being iterated.
    pub fn broadcast(&self, message: &ServerMessage) -> Result<BroadcastReport, serde_json::Error> {
        let frame = Message::Text(message.to_json()?.into());
        let targets: Vec<(ConnectionId, ConnectionHandle)> = self
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut report = BroadcastReport::default();
        for (id, handle) in targets {
            match handle.deliver(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Closed) => {
                    debug!(connection_id = %id, "Dropping broadcast to closed connection");
                    self.connections.remove(&id);
                    report.dropped += 1;
                }
                Err(DeliveryError::Full) => {
                    warn!(connection_id = %id, "Outbound buffer full, evicting connection");
                    self.connections.remove(&id);
                    handle.shut_down();
                    report.evicted += 1;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelmap_core::Cell;
    use std::time::Duration;

    fn update() -> ServerMessage {
        ServerMessage::Update {
            data: Cell {
                x: 1,
                y: 2,
                color: "#ff0000".to_string(),
                owner: "alice".to_string(),
                painted_at: 0,
            },
        }
    }

    fn connection(capacity: usize) -> (ConnectionId, ConnectionHandle, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Uuid::new_v4(), ConnectionHandle::new(tx), rx)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let registry = ConnectionRegistry::new();
        let (id1, h1, mut rx1) = connection(4);
        let (id2, h2, mut rx2) = connection(4);
        registry.register(id1, h1);
        registry.register(id2, h2);

        let report = registry.broadcast(&update()).unwrap();
        assert_eq!(report.delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("Expected text frame");
            };
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(value["type"], "UPDATE");
        }
    }

    #[tokio::test]
    async fn test_deregistered_connection_not_reached() {
        let registry = ConnectionRegistry::new();
        let (id1, h1, mut rx1) = connection(4);
        let (id2, h2, mut rx2) = connection(4);
        registry.register(id1, h1);
        registry.register(id2, h2);

        assert!(registry.deregister(&id2));
        assert!(!registry.deregister(&id2));

        let report = registry.broadcast(&update()).unwrap();
        assert_eq!(report.delivered, 1);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_dropped_silently() {
        let registry = ConnectionRegistry::new();
        let (id, handle, rx) = connection(4);
        registry.register(id, handle);
        drop(rx);

        let report = registry.broadcast(&update()).unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.delivered, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_full_buffer_evicts_only_slow_consumer() {
        let registry = ConnectionRegistry::new();
        let (slow_id, slow, _slow_rx) = connection(1);
        let (fast_id, fast, mut fast_rx) = connection(8);
        registry.register(slow_id, slow.clone());
        registry.register(fast_id, fast);

        let first = registry.broadcast(&update()).unwrap();
        assert_eq!(first.delivered, 2);

        let second = registry.broadcast(&update()).unwrap();
        assert_eq!(second.delivered, 1);
        assert_eq!(second.evicted, 1);
        assert!(!registry.contains(&slow_id));
        assert!(registry.contains(&fast_id));

        tokio::time::timeout(Duration::from_secs(1), slow.shutdown_requested())
            .await
            .expect("evicted connection should be told to shut down");

        assert!(fast_rx.recv().await.is_some());
        assert!(fast_rx.recv().await.is_some());
    }
}
