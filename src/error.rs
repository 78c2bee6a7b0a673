//! Error types for the chat server
//!
//! Defines application-level errors, name negotiation rejections and
//! outbound send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Only startup failures (bad port, bind, transcript creation) are fatal
/// to the process. Transport failures on a single connection are treated
/// as a disconnect and never surface as an `AppError`.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal at startup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Listen port argument could not be parsed
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// The broadcast hub is gone and no longer accepts events
    #[error("Event funnel closed")]
    FunnelClosed,
}

/// Reasons a display name is refused during negotiation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameRejected {
    /// Empty or whitespace-only name
    #[error("Username is invalid")]
    Invalid,

    /// Name already held by a live session
    #[error("Username '{0}' is taken")]
    Taken(String),
}

/// Outbound send errors
///
/// Occurs when the writer task of a connection has already stopped.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
