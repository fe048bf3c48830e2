//! RelayServer actor implementation
//!
//! The central actor owning all process-wide mutable state: the
//! connection registry, the room directory and the delivery tracker.
//! Commands from connection handlers are processed one at a time, so
//! every mutation of a room's member set or a message's status is
//! serialized without locks. Each `RelayServer` owns its own state;
//! tests run as many independent instances as they like.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::RelayError;
use crate::event::ServerEvent;
use crate::presence;
use crate::registry::ConnectionRegistry;
use crate::relay::{DeliveryStatus, DeliveryTracker};
use crate::room::{Member, RoomDirectory};
use crate::types::{ConnectionId, MessageId, RoomName};

/// Commands sent from handlers to the RelayServer actor
#[derive(Debug)]
pub enum Command {
    /// New connection registered
    Connect {
        id: ConnectionId,
        sender: mpsc::Sender<ServerEvent>,
    },
    /// Connection's transport ended
    Disconnect { id: ConnectionId },
    /// Join a room (raw, unvalidated inputs)
    Join {
        id: ConnectionId,
        room: String,
        name: String,
        joining_time: String,
        profile_image: String,
    },
    /// Leave a room explicitly
    Leave { id: ConnectionId, room: RoomName },
    /// Send a chat message to a room
    Send {
        id: ConnectionId,
        message_id: MessageId,
        text: String,
        room: RoomName,
        sender_name: String,
        profile_image: String,
        time: String,
    },
    /// A recipient reported local receipt of a message
    AcknowledgeDelivered {
        id: ConnectionId,
        message_id: MessageId,
        recipient_id: ConnectionId,
    },
    /// A viewing connection marked a room's messages as seen
    MarkSeen {
        id: ConnectionId,
        room: RoomName,
        seen_by: ConnectionId,
    },
    /// Composition started
    StartTyping {
        id: ConnectionId,
        room: RoomName,
        name: String,
        profile_image: String,
    },
    /// Composition stopped
    StopTyping {
        id: ConnectionId,
        room: RoomName,
        name: String,
        profile_image: String,
    },
}

/// The main RelayServer actor
pub struct RelayServer {
    /// Live connections and their current room membership
    registry: ConnectionRegistry,
    /// Rooms that currently have members
    directory: RoomDirectory,
    /// Per-message delivery status
    tracker: DeliveryTracker,
    /// Command receiver channel
    receiver: mpsc::Receiver<Command>,
}

impl RelayServer {
    /// Create a new RelayServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<Command>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(),
            tracker: DeliveryTracker::new(),
            receiver,
        }
    }

    /// Run the RelayServer event loop
    ///
    /// Continuously receives and processes commands until all senders
    /// are dropped.
    pub async fn run(mut self) {
        info!("RelayServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("RelayServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { id, sender } => {
                self.handle_connect(id, sender).await;
            }
            Command::Disconnect { id } => {
                self.handle_disconnect(id).await;
            }
            Command::Join {
                id,
                room,
                name,
                joining_time,
                profile_image,
            } => {
                self.handle_join(id, room, name, joining_time, profile_image).await;
            }
            Command::Leave { id, room } => {
                self.handle_leave(id, room).await;
            }
            Command::Send {
                id,
                message_id,
                text,
                room,
                sender_name,
                profile_image,
                time,
            } => {
                self.handle_send(id, message_id, text, room, sender_name, profile_image, time)
                    .await;
            }
            Command::AcknowledgeDelivered {
                id,
                message_id,
                recipient_id,
            } => {
                self.handle_acknowledge_delivered(id, message_id, recipient_id).await;
            }
            Command::MarkSeen { id, room, seen_by } => {
                self.handle_mark_seen(id, room, seen_by).await;
            }
            Command::StartTyping {
                id,
                room,
                name,
                profile_image,
            } => {
                self.handle_start_typing(id, room, name, profile_image).await;
            }
            Command::StopTyping {
                id,
                room,
                name,
                profile_image,
            } => {
                self.handle_stop_typing(id, room, name, profile_image).await;
            }
        }
    }

    /// Handle new connection registration
    async fn handle_connect(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        info!("Connection {} registered", id);
        self.registry.insert(id, sender);

        // Full-state lobby broadcast so the newcomer sees which rooms
        // have members
        self.registry
            .send_all(&presence::global_snapshot(&self.directory))
            .await;

        debug!(
            "Total connections: {}, total rooms: {}",
            self.registry.len(),
            self.directory.room_count()
        );
    }

    /// Handle connection teardown: an implicit, silent leave
    async fn handle_disconnect(&mut self, id: ConnectionId) {
        // Unknown id is a no-op; remove first so fan-outs skip the
        // departing connection
        let Some(connection) = self.registry.remove(id) else {
            return;
        };
        info!("Connection {} disconnected", id);

        if let Some(room) = connection.room {
            self.leave_room(id, &room).await;
            self.registry
                .send_all(&presence::global_snapshot(&self.directory))
                .await;
        }

        debug!(
            "Total connections: {}, total rooms: {}",
            self.registry.len(),
            self.directory.room_count()
        );
    }

    /// Handle a join request
    async fn handle_join(
        &mut self,
        id: ConnectionId,
        room: String,
        name: String,
        joining_time: String,
        profile_image: String,
    ) {
        // Ignore joins from connections that are already gone; a member
        // record must never outlive its connection
        if !self.registry.contains(id) {
            return;
        }

        let name = name.trim();
        let Some(room) = RoomName::parse(&room) else {
            self.registry
                .send(id, ServerEvent::room_error(&RelayError::InvalidJoinRequest))
                .await;
            return;
        };
        if name.is_empty() {
            self.registry
                .send(id, ServerEvent::room_error(&RelayError::InvalidJoinRequest))
                .await;
            return;
        }

        // A connection is never in two rooms: leaving the previous room
        // comes first, with full leave semantics. Re-joining the same
        // room just replaces the member record.
        if let Some(old_room) = self.registry.room_of(id).cloned() {
            if old_room != room {
                self.leave_room(id, &old_room).await;
            }
        }

        let member = self.directory.join(
            id,
            room.clone(),
            name.to_string(),
            joining_time,
            profile_image,
        );
        self.registry.set_room(id, Some(room.clone()));
        info!("Connection {} joined room {} as '{}'", id, room, member.user_name);

        // Ack to the joiner with its own membership record
        self.registry
            .send(
                id,
                ServerEvent::RoomJoined {
                    room: room.clone(),
                    socket_id: id,
                    user_name: member.user_name.clone(),
                    joining_time: member.joining_time.clone(),
                    profile_image: member.profile_image.clone(),
                },
            )
            .await;

        let Some(room_entry) = self.directory.room(&room) else {
            return;
        };
        let member_ids = room_entry.member_ids();
        let others: Vec<ConnectionId> = member_ids.iter().copied().filter(|m| *m != id).collect();
        let snapshot = presence::room_snapshot(room_entry);

        // Announce to the pre-existing members
        self.registry
            .send_to(
                &others,
                &ServerEvent::UserJoined {
                    user_name: member.user_name.clone(),
                    socket_id: id,
                    joining_time: member.joining_time.clone(),
                    profile_image: member.profile_image.clone(),
                },
            )
            .await;

        // Membership changed: room snapshot to the room, global
        // snapshot to everyone, in the same broadcast cycle
        self.registry.send_to(&member_ids, &snapshot).await;
        self.registry
            .send_all(&presence::global_snapshot(&self.directory))
            .await;
    }

    /// Handle an explicit leave request
    async fn handle_leave(&mut self, id: ConnectionId, room: RoomName) {
        if self.leave_room(id, &room).await.is_none() {
            self.registry
                .send(id, ServerEvent::room_error(&RelayError::NotInRoom))
                .await;
            return;
        }
        self.registry
            .send_all(&presence::global_snapshot(&self.directory))
            .await;
    }

    /// Handle a chat message
    async fn handle_send(
        &mut self,
        id: ConnectionId,
        message_id: MessageId,
        text: String,
        room: RoomName,
        sender_name: String,
        profile_image: String,
        time: String,
    ) {
        // Atomic check-then-act: a failed send mutates nothing
        let Some(room_entry) = self.directory.room(&room) else {
            self.registry
                .send(
                    id,
                    ServerEvent::message_error(&RelayError::RoomNotFound(room.to_string())),
                )
                .await;
            return;
        };
        if !room_entry.contains(id) {
            self.registry
                .send(id, ServerEvent::message_error(&RelayError::NotInRoom))
                .await;
            return;
        }
        if text.trim().is_empty() {
            self.registry
                .send(id, ServerEvent::message_error(&RelayError::EmptyMessage))
                .await;
            return;
        }
        let member_ids = room_entry.member_ids();

        let message_id = if message_id.is_blank() {
            MessageId::generate()
        } else {
            message_id
        };

        // Exactly-once per message id: a retransmit is dropped without
        // a second broadcast
        if !self.tracker.record(message_id.clone(), room.clone(), id) {
            debug!("Duplicate message {} dropped", message_id);
            return;
        }
        debug!(
            "Relaying message {} from {} to {} members of {}",
            message_id,
            id,
            member_ids.len(),
            room
        );

        // Broadcast to every member, the sender included: its UI
        // reconciles the relayed copy with the optimistic one by id
        self.registry
            .send_to(
                &member_ids,
                &ServerEvent::MszReceived {
                    message_id,
                    message: text,
                    room,
                    sender_id: id,
                    sender_name,
                    profile_image,
                    time,
                    status: DeliveryStatus::Sent,
                },
            )
            .await;
    }

    /// Handle a recipient's delivery report
    async fn handle_acknowledge_delivered(
        &mut self,
        id: ConnectionId,
        message_id: MessageId,
        recipient_id: ConnectionId,
    ) {
        match self.tracker.acknowledge_delivered(&message_id) {
            Some((sender, true)) => {
                debug!("Message {} delivered, notifying sender {}", message_id, sender);
                self.registry
                    .send(
                        sender,
                        ServerEvent::MessageStatusUpdate {
                            message_id,
                            status: DeliveryStatus::Delivered,
                            recipient_id,
                        },
                    )
                    .await;
            }
            Some((_, false)) => {
                // Late report after a seen marker: status never regresses
            }
            None => {
                debug!("Delivery report from {} for unknown message {}", id, message_id);
            }
        }
    }

    /// Handle a room-wide seen marker
    async fn handle_mark_seen(&mut self, id: ConnectionId, room: RoomName, seen_by: ConnectionId) {
        let Some(room_entry) = self.directory.room(&room) else {
            debug!("Seen marker from {} for unknown room {}", id, room);
            return;
        };
        let member_ids = room_entry.member_ids();

        let flipped = self.tracker.mark_seen(&room, seen_by);
        debug!("{} messages in {} marked seen by {}", flipped, room, seen_by);

        // Rebroadcast the marker verbatim; each receiver applies it to
        // its own message set locally
        self.registry
            .send_to(&member_ids, &ServerEvent::MessagesSeen { room, seen_by })
            .await;
    }

    /// Handle a typing-start signal
    async fn handle_start_typing(
        &mut self,
        id: ConnectionId,
        room: RoomName,
        name: String,
        profile_image: String,
    ) {
        let Some(others) = self.typing_targets(id, &room) else {
            self.registry
                .send(id, ServerEvent::room_error(&RelayError::NotInRoom))
                .await;
            return;
        };
        self.registry
            .send_to(&others, &ServerEvent::UserTyping { name, profile_image })
            .await;
    }

    /// Handle a typing-stop signal
    async fn handle_stop_typing(
        &mut self,
        id: ConnectionId,
        room: RoomName,
        name: String,
        profile_image: String,
    ) {
        let Some(others) = self.typing_targets(id, &room) else {
            self.registry
                .send(id, ServerEvent::room_error(&RelayError::NotInRoom))
                .await;
            return;
        };
        self.registry
            .send_to(&others, &ServerEvent::UserTypingStop { name, profile_image })
            .await;
    }

    /// Fan-out targets for a typing signal: every other member of the
    /// room, or None when the signaling connection is not a member
    fn typing_targets(&self, id: ConnectionId, room: &RoomName) -> Option<Vec<ConnectionId>> {
        let room = self.directory.room(room)?;
        if !room.contains(id) {
            return None;
        }
        Some(room.member_ids().into_iter().filter(|m| *m != id).collect())
    }

    /// Shared leave semantics for explicit leave, implicit leave on
    /// join, and disconnect
    ///
    /// Removes the member, notifies the remaining members (`user_left`
    /// plus a fresh room snapshot) and, when the room empties, destroys
    /// it together with its tracked messages. The caller emits the
    /// global snapshot once per inbound command.
    async fn leave_room(&mut self, id: ConnectionId, room: &RoomName) -> Option<Member> {
        let member = self.directory.leave(id, room)?;
        self.registry.set_room(id, None);
        info!("Connection {} left room {}", id, room);

        match self.directory.room(room) {
            Some(room_entry) => {
                let member_ids = room_entry.member_ids();
                let snapshot = presence::room_snapshot(room_entry);
                self.registry
                    .send_to(
                        &member_ids,
                        &ServerEvent::UserLeft {
                            socket_id: member.connection_id,
                            user_name: member.user_name.clone(),
                        },
                    )
                    .await;
                self.registry.send_to(&member_ids, &snapshot).await;
            }
            None => {
                debug!("Room {} destroyed (empty)", room);
                self.tracker.drop_room(room);
            }
        }
        Some(member)
    }
}
