//! Wire text protocol
//!
//! Plain text over a byte stream. Clients send newline-delimited lines.
//! Prompts are not newline-terminated so the client types right after
//! them; broadcast lines are.

use crate::error::NameRejected;
use crate::types::Timestamp;

/// Sent to a connection refused at admission, right before closing it
pub const CHAT_FULL: &str = "Sorry, the chat is full\n";

/// Banner used when the welcome file cannot be read
pub const DEFAULT_WELCOME: &str = "Welcome to TCP-Chat!\n[ENTER YOUR NAME]: ";

/// Client-facing line for a refused display name
pub fn rejection(reason: &NameRejected) -> &'static str {
    match reason {
        NameRejected::Invalid => "Username is invalid, please enter a new one\n",
        NameRejected::Taken(_) => "Username is taken, please enter a new one\n",
    }
}

/// Input prompt for `name`: `[<time>][<name>]: `
pub fn prompt(at: &Timestamp, name: &str) -> String {
    format!("[{}][{}]: ", at, name)
}

/// Rendered chat line, identical in the transcript and on screen
pub fn chat_line(at: &Timestamp, name: &str, text: &str) -> String {
    format!("[{}][{}]: {}", at, name, text)
}

/// Rendered join notice
pub fn joined(name: &str) -> String {
    format!("{} joined chat", name)
}

/// Rendered leave notice
pub fn left(name: &str) -> String {
    format!("{} has left chat...", name)
}

/// What a recipient sees for a broadcast event: the event text on its own
/// line followed by a fresh prompt carrying the recipient's own name.
pub fn broadcast_frame(text: &str, at: &Timestamp, recipient: &str) -> String {
    format!("\n{}\n{}", text, prompt(at, recipient))
}
