//! Message delivery tracking
//!
//! Owns the per-message delivery-status state machine
//! (`sent → delivered → seen`) and the dedup set that makes message
//! broadcast exactly-once per message ID. Status is a room-visible
//! aggregate: any recipient's report moves it forward, and it never
//! regresses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, MessageId, RoomName};

/// Delivery lifecycle stage of a chat message
///
/// The variant order gives the total order `Sent < Delivered < Seen`
/// used to enforce forward-only transitions. A `seen` report may land
/// before any `delivered` report, so `Sent → Seen` is a legal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Seen,
}

impl DeliveryStatus {
    /// Move the status forward to `to`
    ///
    /// Returns true if the status actually changed. A report that would
    /// move the status backwards (or sideways) is ignored.
    pub fn advance(&mut self, to: DeliveryStatus) -> bool {
        if to > *self {
            *self = to;
            true
        } else {
            false
        }
    }
}

/// One tracked chat message
#[derive(Debug)]
pub struct MessageRecord {
    pub id: MessageId,
    pub room: RoomName,
    pub sender: ConnectionId,
    pub status: DeliveryStatus,
}

/// Delivery tracker: message ID → record
///
/// Records live as long as their room does; `drop_room` forgets them
/// when the room is destroyed.
#[derive(Debug, Default)]
pub struct DeliveryTracker {
    messages: HashMap<MessageId, MessageRecord>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly sent message with status `Sent`
    ///
    /// Returns false if the ID is already tracked: the message is a
    /// duplicate (retransmit or multi-path delivery) and must not be
    /// broadcast again.
    pub fn record(&mut self, id: MessageId, room: RoomName, sender: ConnectionId) -> bool {
        if self.messages.contains_key(&id) {
            return false;
        }
        self.messages.insert(
            id.clone(),
            MessageRecord {
                id,
                room,
                sender,
                status: DeliveryStatus::Sent,
            },
        );
        true
    }

    /// Apply a recipient's delivery report
    ///
    /// Returns the recorded sender together with whether the status
    /// advanced, or None when the message is unknown. Last report wins;
    /// a report arriving after `Seen` advances nothing.
    pub fn acknowledge_delivered(&mut self, id: &MessageId) -> Option<(ConnectionId, bool)> {
        let record = self.messages.get_mut(id)?;
        let advanced = record.status.advance(DeliveryStatus::Delivered);
        Some((record.sender, advanced))
    }

    /// Mark every message in `room` not authored by `seen_by` as seen
    ///
    /// Returns how many records changed.
    pub fn mark_seen(&mut self, room: &RoomName, seen_by: ConnectionId) -> usize {
        let mut flipped = 0;
        for record in self.messages.values_mut() {
            if &record.room == room
                && record.sender != seen_by
                && record.status.advance(DeliveryStatus::Seen)
            {
                flipped += 1;
            }
        }
        flipped
    }

    /// Forget every message of a destroyed room
    pub fn drop_room(&mut self, room: &RoomName) {
        self.messages.retain(|_, record| &record.room != room);
    }

    /// Current status of a message, if tracked
    pub fn status(&self, id: &MessageId) -> Option<DeliveryStatus> {
        self.messages.get(id).map(|record| record.status)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
