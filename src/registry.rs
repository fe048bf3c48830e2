//! Connection registry
//!
//! Maps live connection IDs to their outbound event channel and current
//! room membership, and provides the fan-out primitives the relay
//! broadcasts through. A destination that has already disconnected is
//! skipped, never an error.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::SendError;
use crate::event::ServerEvent;
use crate::types::{ConnectionId, RoomName};

/// One live connection
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Room the connection is currently a member of, if any
    pub room: Option<RoomName>,
    /// Server → Client event channel
    sender: mpsc::Sender<ServerEvent>,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id,
            room: None,
            sender,
        }
    }

    /// Send an event to this connection
    ///
    /// Returns an error if the channel is closed (connection gone).
    pub async fn send(&self, event: ServerEvent) -> Result<(), SendError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

/// Registry of all live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.connections.insert(id, Connection::new(id, sender));
    }

    /// Remove a connection; unknown IDs are a no-op
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Current room of a connection
    pub fn room_of(&self, id: ConnectionId) -> Option<&RoomName> {
        self.connections.get(&id).and_then(|c| c.room.as_ref())
    }

    /// Record the connection's room transition
    pub fn set_room(&mut self, id: ConnectionId, room: Option<RoomName>) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.room = room;
        }
    }

    /// Send one event to one connection, skipping it if gone
    pub async fn send(&self, id: ConnectionId, event: ServerEvent) {
        let Some(connection) = self.connections.get(&id) else {
            debug!("Dropping event for unknown connection {}", id);
            return;
        };
        if connection.send(event).await.is_err() {
            debug!("Dropping event for closed connection {}", id);
        }
    }

    /// Fan an event out to a set of connections
    pub async fn send_to(&self, ids: &[ConnectionId], event: &ServerEvent) {
        for id in ids {
            self.send(*id, event.clone()).await;
        }
    }

    /// Fan an event out to every live connection
    pub async fn send_all(&self, event: &ServerEvent) {
        for connection in self.connections.values() {
            if connection.send(event.clone()).await.is_err() {
                debug!("Dropping event for closed connection {}", connection.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_remove() {
        let mut registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(8);

        registry.insert(id, tx);
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_room_bookkeeping() {
        let mut registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(8);
        registry.insert(id, tx);

        assert!(registry.room_of(id).is_none());

        let lobby = RoomName::parse("lobby").unwrap();
        registry.set_room(id, Some(lobby.clone()));
        assert_eq!(registry.room_of(id), Some(&lobby));

        registry.set_room(id, None);
        assert!(registry.room_of(id).is_none());

        // Unknown connection: silently ignored
        registry.set_room(ConnectionId::new(), Some(lobby));
    }

    #[tokio::test]
    async fn test_send_skips_missing_and_closed() {
        let mut registry = ConnectionRegistry::new();
        let alive = ConnectionId::new();
        let gone = ConnectionId::new();
        let (alive_tx, mut alive_rx) = mpsc::channel(8);
        let (gone_tx, gone_rx) = mpsc::channel(8);
        registry.insert(alive, alive_tx);
        registry.insert(gone, gone_tx);
        drop(gone_rx);

        let event = ServerEvent::RoomError {
            message: "test".to_string(),
        };
        registry.send_to(&[alive, gone, ConnectionId::new()], &event).await;

        assert_eq!(alive_rx.recv().await, Some(event));
        assert!(alive_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_all() {
        let mut registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.insert(ConnectionId::new(), tx1);
        registry.insert(ConnectionId::new(), tx2);

        let event = ServerEvent::RoomsWithMembers { rooms: Vec::new() };
        registry.send_all(&event).await;

        assert_eq!(rx1.recv().await, Some(event.clone()));
        assert_eq!(rx2.recv().await, Some(event));
    }
}
