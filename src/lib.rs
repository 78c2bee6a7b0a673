//! Multi-user TCP Chat Server Library
//!
//! A line-oriented chat server: clients connect over TCP, pick a unique
//! display name and exchange messages broadcast to everyone else. Every
//! event is appended to a transcript that is replayed to newcomers.
//!
//! # Features
//! - Admission control (10 concurrent connections by default)
//! - Name negotiation with retry on taken or blank names
//! - Join, chat and leave broadcasts with self-exclusion
//! - Transcript persistence and replay on join
//!
//! # Architecture
//! - `Registry` holds live sessions and the admission counter behind one lock
//! - Each connection runs a `Session` worker plus a writer task
//! - Workers feed events into the `Funnel`
//! - `ChatServer` is the single hub task that persists and fans out events,
//!   so every client and the transcript see one global order
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tcp_chat::{handler, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(config.bind_addr()).await.unwrap();
//!     handler::run(listener, &config).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod funnel;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod transcript;
pub mod types;

// Re-export main types for convenience
pub use client::Peer;
pub use config::{parse_args, ParsedArgs, ServerConfig};
pub use error::{AppError, NameRejected, SendError};
pub use event::{Event, EventKind};
pub use funnel::{Funnel, FunnelReceiver};
pub use handler::{handle_connection, serve};
pub use registry::{Admission, Registry};
pub use server::ChatServer;
pub use session::{Session, SessionContext, SessionState};
pub use transcript::Transcript;
pub use types::{ClientId, Timestamp};
