//! Presence snapshot derivation
//!
//! Pure functions from directory state to presence events. Snapshots
//! are full-state on purpose: a receiver that missed an update is made
//! whole by the next one, at the cost of bandwidth.

use std::collections::BTreeMap;

use crate::event::{MemberInfo, ServerEvent};
use crate::room::{Room, RoomDirectory};

/// Membership snapshot of one room (`active_users_updated`)
pub fn room_snapshot(room: &Room) -> ServerEvent {
    ServerEvent::ActiveUsersUpdated {
        users: room.snapshot(),
    }
}

/// Global snapshot of every room with members (`rooms_with_members`)
///
/// Rooms with zero members cannot appear: the directory drops them on
/// their last leave. Empty directory serializes as `[]`, otherwise as a
/// one-element array wrapping the room → members map (BTreeMap keeps
/// the room order deterministic).
pub fn global_snapshot(directory: &RoomDirectory) -> ServerEvent {
    let mut by_room: BTreeMap<String, Vec<MemberInfo>> = BTreeMap::new();
    for room in directory.rooms() {
        by_room.insert(room.name.to_string(), room.snapshot());
    }

    let rooms = if by_room.is_empty() {
        Vec::new()
    } else {
        vec![by_room]
    };
    ServerEvent::RoomsWithMembers { rooms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionId, RoomName};

    fn join(directory: &mut RoomDirectory, id: ConnectionId, room: &str, user: &str) {
        directory.join(
            id,
            RoomName::parse(room).unwrap(),
            user.to_string(),
            "10:00:00 AM".to_string(),
            String::new(),
        );
    }

    #[test]
    fn test_global_snapshot_empty() {
        let directory = RoomDirectory::new();
        assert_eq!(
            global_snapshot(&directory),
            ServerEvent::RoomsWithMembers { rooms: Vec::new() }
        );
    }

    #[test]
    fn test_global_snapshot_covers_all_rooms() {
        let mut directory = RoomDirectory::new();
        join(&mut directory, ConnectionId::new(), "lobby", "Alice");
        join(&mut directory, ConnectionId::new(), "den", "Bob");

        let ServerEvent::RoomsWithMembers { rooms } = global_snapshot(&directory) else {
            panic!("Wrong event");
        };
        assert_eq!(rooms.len(), 1);
        let by_room = &rooms[0];
        assert_eq!(by_room.len(), 2);
        assert_eq!(by_room["lobby"][0].user_name, "Alice");
        assert_eq!(by_room["den"][0].user_name, "Bob");
    }

    #[test]
    fn test_global_snapshot_omits_emptied_room() {
        let mut directory = RoomDirectory::new();
        let alice = ConnectionId::new();
        join(&mut directory, alice, "lobby", "Alice");
        join(&mut directory, ConnectionId::new(), "den", "Bob");
        directory.leave(alice, &RoomName::parse("lobby").unwrap());

        let ServerEvent::RoomsWithMembers { rooms } = global_snapshot(&directory) else {
            panic!("Wrong event");
        };
        assert!(!rooms[0].contains_key("lobby"));
        assert!(rooms[0].contains_key("den"));
    }

    #[test]
    fn test_room_snapshot() {
        let mut directory = RoomDirectory::new();
        let alice = ConnectionId::new();
        join(&mut directory, alice, "lobby", "Alice");

        let room = directory.room(&RoomName::parse("lobby").unwrap()).unwrap();
        let ServerEvent::ActiveUsersUpdated { users } = room_snapshot(room) else {
            panic!("Wrong event");
        };
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].socket_id, alice);
    }
}
