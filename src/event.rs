//! Wire event protocol
//!
//! JSON-based bidirectional event contract using Serde's tagged enums:
//! every frame is one object with a snake_case `type` tag and camelCase
//! payload fields. Dispatch on the server side is an exhaustive `match`
//! over `ClientEvent` — there is no string-keyed handler table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::relay::DeliveryStatus;
use crate::types::{ConnectionId, MessageId, RoomName};

/// One member of a room as it appears in presence payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub socket_id: ConnectionId,
    pub user_name: String,
    pub joining_time: String,
    pub profile_image: String,
}

/// Client → Server event
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a room, implicitly leaving the current one
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room: String,
        name: String,
        joining_time: String,
        profile_image: String,
    },
    /// Leave a room explicitly
    LeaveRoom { room: RoomName },
    /// Send a chat message to a room
    ///
    /// `sender_id` is what the client believes its ID is; the relay
    /// stamps the actual connection ID on the broadcast instead.
    #[serde(rename_all = "camelCase")]
    MszSend {
        message_id: MessageId,
        message: String,
        room: RoomName,
        sender_id: ConnectionId,
        sender_name: String,
        profile_image: String,
        time: String,
    },
    /// Recipient-side receipt report for one message
    #[serde(rename_all = "camelCase")]
    MessageDelivered {
        message_id: MessageId,
        room: RoomName,
        recipient_id: ConnectionId,
        sender_id: ConnectionId,
    },
    /// Room-wide coarse seen marker from a viewing connection
    #[serde(rename_all = "camelCase")]
    MessagesSeen { room: RoomName, seen_by: ConnectionId },
    /// Composition started
    #[serde(rename_all = "camelCase")]
    UserStartTyping {
        name: String,
        room: RoomName,
        profile_image: String,
    },
    /// Composition stopped
    #[serde(rename_all = "camelCase")]
    UserStopTyping {
        name: String,
        room: RoomName,
        profile_image: String,
    },
}

/// Server → Client event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection accepted, connection ID issued
    #[serde(rename_all = "camelCase")]
    Connected { socket_id: ConnectionId },
    /// Join acknowledgment, sent to the joiner only
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room: RoomName,
        socket_id: ConnectionId,
        user_name: String,
        joining_time: String,
        profile_image: String,
    },
    /// A new member joined, sent to the other members of the room
    #[serde(rename_all = "camelCase")]
    UserJoined {
        user_name: String,
        socket_id: ConnectionId,
        joining_time: String,
        profile_image: String,
    },
    /// A member left, sent to the remaining members of the room
    #[serde(rename_all = "camelCase")]
    UserLeft {
        socket_id: ConnectionId,
        user_name: String,
    },
    /// Full membership snapshot of one room, ordered by join time
    ActiveUsersUpdated { users: Vec<MemberInfo> },
    /// Full global snapshot: every room that currently has members
    ///
    /// Empty array when no room has members, otherwise a one-element
    /// array wrapping the room → members map.
    RoomsWithMembers {
        rooms: Vec<BTreeMap<String, Vec<MemberInfo>>>,
    },
    /// A chat message relayed to every member of its room
    #[serde(rename_all = "camelCase")]
    MszReceived {
        message_id: MessageId,
        message: String,
        room: RoomName,
        sender_id: ConnectionId,
        sender_name: String,
        profile_image: String,
        time: String,
        status: DeliveryStatus,
    },
    /// Delivery-status change, sent to the message's sender only
    #[serde(rename_all = "camelCase")]
    MessageStatusUpdate {
        message_id: MessageId,
        status: DeliveryStatus,
        recipient_id: ConnectionId,
    },
    /// Seen marker rebroadcast to the whole room
    #[serde(rename_all = "camelCase")]
    MessagesSeen { room: RoomName, seen_by: ConnectionId },
    /// Someone else in the room is typing
    #[serde(rename_all = "camelCase")]
    UserTyping { name: String, profile_image: String },
    /// Someone else in the room stopped typing
    #[serde(rename_all = "camelCase")]
    UserTypingStop { name: String, profile_image: String },
    /// Room operation failed (join/leave/typing), sent to the caller only
    RoomError { message: String },
    /// Message operation failed (send), sent to the caller only
    MessageError { message: String },
}

impl ServerEvent {
    /// Wrap a recoverable error for the room error channel
    pub fn room_error(err: &RelayError) -> Self {
        Self::RoomError {
            message: err.to_string(),
        }
    }

    /// Wrap a recoverable error for the message error channel
    pub fn message_error(err: &RelayError) -> Self {
        Self::MessageError {
            message: err.to_string(),
        }
    }
}
