//! Basic type definitions for the relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `RoomName`: validated (trimmed, non-empty) room name
//! - `MessageId`: opaque globally-unique chat message identifier

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4, stable for the lifetime of one transport session.
/// Implements Hash, Eq and Ord for use as map keys and as a deterministic
/// tie-breaker when ordering presence snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name
///
/// Only `RoomName::parse` produces names that enter the room directory,
/// so every directory key is trimmed and non-empty. Names arriving on
/// other inbound events deserialize as-is and simply fail lookup when
/// they never matched a join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Validate a raw room name: trims whitespace, rejects the empty result
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat message identifier
///
/// Clients mint their own IDs (UUID strings on the wire) so they can
/// reconcile the relayed copy with their optimistic local copy. The
/// server treats the value as opaque and mints one itself only when the
/// client left it blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Mint a new server-side message ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_room_name_trims() {
        let room = RoomName::parse("  lobby  ").unwrap();
        assert_eq!(room.as_str(), "lobby");
    }

    #[test]
    fn test_room_name_rejects_blank() {
        assert!(RoomName::parse("").is_none());
        assert!(RoomName::parse("   ").is_none());
    }

    #[test]
    fn test_message_id_generate_unique() {
        let id1 = MessageId::generate();
        let id2 = MessageId::generate();
        assert_ne!(id1, id2);
        assert!(!id1.is_blank());
    }

    #[test]
    fn test_message_id_blank() {
        assert!(MessageId(String::new()).is_blank());
        assert!(MessageId("  ".to_string()).is_blank());
        assert!(!MessageId("m1".to_string()).is_blank());
    }
}
