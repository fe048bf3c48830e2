//! Error types for the relay
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and business
/// errors (reported back to the originating connection only). Business
/// errors are check-then-act: the failed operation has no side effects.
#[derive(Debug, Error)]
pub enum RelayError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Join with an empty room name or display name
    #[error("Invalid room or username")]
    InvalidJoinRequest,

    /// Leave/send/typing from a connection that is not a member
    #[error("You are not in this room")]
    NotInRoom,

    /// Message text is empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Send targeting a room with no members
    #[error("Room '{0}' not found")]
    RoomNotFound(String),
}

/// Message send errors
///
/// Occurs when attempting to send events through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
