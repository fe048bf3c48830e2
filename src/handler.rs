//! WebSocket connection handler
//!
//! Handles individual connections: WebSocket handshake, frame parsing,
//! and bidirectional communication with the RelayServer actor. The
//! handler is the transport seam the core never reaches through: it
//! provides per-connection identity and the disconnect notification.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::event::{ClientEvent, ServerEvent};
use crate::server::Command;
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, issues a connection ID, and
/// manages the connection lifecycle. Whichever of the read/write tasks
/// ends first tears the connection down with a `Disconnect` command.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<Command>,
) -> Result<(), RelayError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!("Connection {} opened from {}", connection_id, peer_addr);

    // Channel for server -> client events
    let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(32);

    // Register with the RelayServer
    if cmd_tx
        .send(Command::Connect {
            id: connection_id,
            sender: event_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - server closed", connection_id);
        return Err(RelayError::ChannelSend);
    }

    // Tell the client its connection ID; it stamps this onto the
    // sender/seen-by fields of its own events
    let connected = ServerEvent::Connected {
        socket_id: connection_id,
    };
    let json = serde_json::to_string(&connected)?;
    ws_sender.send(Message::Text(json.into())).await?;

    // Clone cmd_tx for the read task
    let cmd_tx_read = cmd_tx.clone();

    // Read task (WebSocket -> Command)
    let read_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        let cmd = client_event_to_command(connection_id, event);
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Server closed, ending read task for {}", connection_id);
                            break;
                        }
                    }
                    Err(e) => {
                        // Malformed frames are dropped; the event
                        // contract has no channel for protocol noise
                        warn!("Invalid event from {}: {}", connection_id, e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong is handled automatically by tungstenite
                }
                Ok(_) => {
                    // Binary or other frame types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Write task (ServerEvent -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for connection");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // A disconnect at any point is an implicit leave
    let _ = cmd_tx.send(Command::Disconnect { id: connection_id }).await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Convert a ClientEvent to a Command
///
/// The connection ID stamped here is the server's own, not whatever the
/// payload claims: sender identity on broadcasts is authoritative.
fn client_event_to_command(id: ConnectionId, event: ClientEvent) -> Command {
    match event {
        ClientEvent::JoinRoom {
            room,
            name,
            joining_time,
            profile_image,
        } => Command::Join {
            id,
            room,
            name,
            joining_time,
            profile_image,
        },
        ClientEvent::LeaveRoom { room } => Command::Leave { id, room },
        ClientEvent::MszSend {
            message_id,
            message,
            room,
            sender_id: _,
            sender_name,
            profile_image,
            time,
        } => Command::Send {
            id,
            message_id,
            text: message,
            room,
            sender_name,
            profile_image,
            time,
        },
        ClientEvent::MessageDelivered {
            message_id,
            room: _,
            recipient_id,
            sender_id: _,
        } => Command::AcknowledgeDelivered {
            id,
            message_id,
            recipient_id,
        },
        ClientEvent::MessagesSeen { room, seen_by } => Command::MarkSeen { id, room, seen_by },
        ClientEvent::UserStartTyping {
            name,
            room,
            profile_image,
        } => Command::StartTyping {
            id,
            room,
            name,
            profile_image,
        },
        ClientEvent::UserStopTyping {
            name,
            room,
            profile_image,
        } => Command::StopTyping {
            id,
            room,
            name,
            profile_image,
        },
    }
}
