//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based connection identity
//! - `Timestamp`: local wall-clock time rendered as `YYYY-MM-DD HH:MM:SS`

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4. This is the identity key for registry membership
/// and for excluding an event's originator from fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format used for every timestamp shown to clients or persisted
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Point in time captured when a prompt or event is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub DateTime<Local>);

impl Timestamp {
    /// Capture the current local time
    pub fn now() -> Self {
        Self(Local::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(TIME_FORMAT))
    }
}
