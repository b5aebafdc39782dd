//! Single-Room Text Relay Library
//!
//! Clients connect over TCP, send length-prefixed text messages, and the
//! server rebroadcasts each message to every other connected client.
//!
//! # Wire format
//! `HEADER || BODY || '\n'`, where `HEADER` is the body length as four
//! zero-padded ASCII digits (so bodies are at most 9999 bytes). The header
//! is authoritative; the newline only marks where to stop reading.
//!
//! # Architecture
//! - `Room` is the single broadcast domain, shared by `Arc` and guarded by
//!   a mutex. It only sees participants through the `Participant` trait.
//! - Each connection runs a `Session` state machine driven by
//!   `handle_connection`: the read loop decodes frames and fans them out,
//!   while a writer task owns the connection's write half and drains the
//!   session's bounded outgoing queue in order.
//! - Cross-session traffic only ever goes through those queues, so a
//!   session's writes are never interleaved.
//!
//! # Example
//! ```ignore
//! use room_relay::{ChatServer, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), room_relay::AppError> {
//!     let server = ChatServer::bind("127.0.0.1:4000", SessionConfig::default()).await?;
//!     server.run_until_ctrl_c().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod message;
pub mod peer;
pub mod room;
pub mod server;
pub mod session;
pub mod types;
pub mod wire;

// Re-export main types for convenience
pub use config::{OverflowPolicy, SessionConfig};
pub use error::{AppError, CodecError, RoomError, SessionError};
pub use handler::handle_connection;
pub use message::{decode_frame, decode_header, Message, HEADER_WIDTH, MAX_BODY};
pub use peer::{CloseReason, Mailbox, Peer};
pub use room::{Delivery, DeliveryReport, Participant, Room};
pub use server::ChatServer;
pub use session::{Session, SessionState};
pub use types::ParticipantId;
