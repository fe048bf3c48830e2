//! Room-Based WebSocket Chat Relay Library
//!
//! A chat relay server built with tokio-tungstenite using the Actor
//! pattern for state management: clients join named rooms, exchange
//! messages, and observe presence, typing, and delivery signals for
//! the other members of their room.
//!
//! # Features
//! - WebSocket connection handling
//! - Named rooms, created on first join and destroyed when empty
//! - Presence snapshots (per room and global)
//! - Real-time chat messaging with per-message delivery status
//!   (`sent → delivered → seen`)
//! - Typing indicators
//! - Disconnection handling (implicit leave)
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RelayServer` is the central actor managing all state
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_relay::{RelayServer, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(RelayServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod room;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use error::{RelayError, SendError};
pub use event::{ClientEvent, MemberInfo, ServerEvent};
pub use handler::handle_connection;
pub use registry::{Connection, ConnectionRegistry};
pub use relay::{DeliveryStatus, DeliveryTracker};
pub use room::{Member, Room, RoomDirectory};
pub use server::{Command, RelayServer};
pub use types::{ConnectionId, MessageId, RoomName};
