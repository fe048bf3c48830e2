//! Room directory
//!
//! Owns membership lifecycle: rooms are created implicitly on first
//! join and destroyed as soon as their member set empties, so a room
//! with zero members never appears in any snapshot.

use std::collections::HashMap;

use crate::event::MemberInfo;
use crate::types::{ConnectionId, RoomName};

/// One connection's presence record inside a room
///
/// `joining_time` and `profile_image` are client-supplied display
/// strings relayed as-is; `seq` is the server-assigned join sequence
/// used for deterministic snapshot ordering.
#[derive(Debug, Clone)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub user_name: String,
    pub joining_time: String,
    pub profile_image: String,
    seq: u64,
}

impl Member {
    pub fn info(&self) -> MemberInfo {
        MemberInfo {
            socket_id: self.connection_id,
            user_name: self.user_name.clone(),
            joining_time: self.joining_time.clone(),
            profile_image: self.profile_image.clone(),
        }
    }
}

/// A named room: a set of active member connections
#[derive(Debug)]
pub struct Room {
    pub name: RoomName,
    members: HashMap<ConnectionId, Member>,
}

impl Room {
    fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashMap::new(),
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// All member connection IDs, in arbitrary order (fan-out targets)
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members.keys().copied().collect()
    }

    /// Ordered membership snapshot: join order, ties broken by
    /// connection ID for determinism
    pub fn snapshot(&self) -> Vec<MemberInfo> {
        let mut members: Vec<&Member> = self.members.values().collect();
        members.sort_by_key(|m| (m.seq, m.connection_id));
        members.iter().map(|m| m.info()).collect()
    }
}

/// Directory of all rooms that currently have members
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomName, Room>,
    next_seq: u64,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member record, creating the room on first join
    ///
    /// A second join by the same connection into the same room replaces
    /// the stale record (and its join position).
    pub fn join(
        &mut self,
        id: ConnectionId,
        room: RoomName,
        user_name: String,
        joining_time: String,
        profile_image: String,
    ) -> Member {
        let seq = self.next_seq;
        self.next_seq += 1;

        let member = Member {
            connection_id: id,
            user_name,
            joining_time,
            profile_image,
            seq,
        };
        self.rooms
            .entry(room)
            .or_insert_with_key(|name| Room::new(name.clone()))
            .members
            .insert(id, member.clone());
        member
    }

    /// Remove a member record, destroying the room if it empties
    ///
    /// Returns the removed member, or None when the connection was not
    /// a member of `room`.
    pub fn leave(&mut self, id: ConnectionId, room: &RoomName) -> Option<Member> {
        let entry = self.rooms.get_mut(room)?;
        let member = entry.members.remove(&id)?;
        if entry.is_empty() {
            self.rooms.remove(room);
        }
        Some(member)
    }

    pub fn room(&self, name: &RoomName) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn contains(&self, room: &RoomName, id: ConnectionId) -> bool {
        self.rooms.get(room).is_some_and(|r| r.contains(id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomName {
        RoomName::parse(name).unwrap()
    }

    fn join(directory: &mut RoomDirectory, id: ConnectionId, name: &str, user: &str) -> Member {
        directory.join(
            id,
            room(name),
            user.to_string(),
            "10:00:00 AM".to_string(),
            String::new(),
        )
    }

    #[test]
    fn test_room_created_on_first_join() {
        let mut directory = RoomDirectory::new();
        assert_eq!(directory.room_count(), 0);

        join(&mut directory, ConnectionId::new(), "lobby", "Alice");

        assert_eq!(directory.room_count(), 1);
        assert_eq!(directory.room(&room("lobby")).unwrap().member_count(), 1);
    }

    #[test]
    fn test_room_destroyed_when_empty() {
        let mut directory = RoomDirectory::new();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        join(&mut directory, alice, "lobby", "Alice");
        join(&mut directory, bob, "lobby", "Bob");

        assert!(directory.leave(alice, &room("lobby")).is_some());
        assert_eq!(directory.room_count(), 1);

        assert!(directory.leave(bob, &room("lobby")).is_some());
        assert_eq!(directory.room_count(), 0);
        assert!(directory.room(&room("lobby")).is_none());
    }

    #[test]
    fn test_leave_non_member() {
        let mut directory = RoomDirectory::new();
        join(&mut directory, ConnectionId::new(), "lobby", "Alice");

        let stranger = ConnectionId::new();
        assert!(directory.leave(stranger, &room("lobby")).is_none());
        assert!(directory.leave(stranger, &room("nowhere")).is_none());
    }

    #[test]
    fn test_snapshot_ordered_by_join_sequence() {
        let mut directory = RoomDirectory::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        let third = ConnectionId::new();
        join(&mut directory, first, "lobby", "Alice");
        join(&mut directory, second, "lobby", "Bob");
        join(&mut directory, third, "lobby", "Carol");

        let snapshot = directory.room(&room("lobby")).unwrap().snapshot();
        let ids: Vec<ConnectionId> = snapshot.iter().map(|m| m.socket_id).collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[test]
    fn test_rejoin_replaces_member_record() {
        let mut directory = RoomDirectory::new();
        let alice = ConnectionId::new();
        let bob = ConnectionId::new();
        join(&mut directory, alice, "lobby", "Alice");
        join(&mut directory, bob, "lobby", "Bob");
        join(&mut directory, alice, "lobby", "Alice2");

        let lobby = directory.room(&room("lobby")).unwrap();
        assert_eq!(lobby.member_count(), 2);
        assert_eq!(lobby.get(alice).unwrap().user_name, "Alice2");

        // Re-join moves Alice to the back of the join order
        let snapshot = lobby.snapshot();
        assert_eq!(snapshot.last().unwrap().socket_id, alice);
    }

    #[test]
    fn test_contains() {
        let mut directory = RoomDirectory::new();
        let alice = ConnectionId::new();
        join(&mut directory, alice, "lobby", "Alice");

        assert!(directory.contains(&room("lobby"), alice));
        assert!(!directory.contains(&room("lobby"), ConnectionId::new()));
        assert!(!directory.contains(&room("den"), alice));
    }
}
