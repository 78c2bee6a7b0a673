//! Outbound handle for a connected client
//!
//! Every byte written to a connection goes through its `Peer` queue and is
//! drained by a dedicated writer task, so neither the session worker nor
//! the broadcast hub ever blocks on a slow socket.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::ClientId;

/// Sending side of a connection's outbound queue
#[derive(Debug, Clone)]
pub struct Peer {
    /// Connection this queue writes to
    pub id: ClientId,
    /// Server → Client text channel
    sender: mpsc::UnboundedSender<String>,
}

impl Peer {
    /// Create a peer handle and the receiver its writer task drains
    pub fn channel(id: ClientId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id, sender }, receiver)
    }

    /// Queue text for this client
    ///
    /// Returns an error if the writer task has stopped (client gone).
    pub fn send(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.sender
            .send(text.into())
            .map_err(|_| SendError::ChannelClosed)
    }
}
