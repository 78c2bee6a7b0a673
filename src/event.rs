//! Chat events flowing from session workers to the broadcast hub
//!
//! An event is built once by a session worker, consumed once by the hub,
//! and never modified in between.

use tokio::sync::oneshot;

use crate::client::Peer;
use crate::message;
use crate::types::{ClientId, Timestamp};

/// What happened
#[derive(Debug)]
pub enum EventKind {
    /// A session finished negotiation
    ///
    /// Carries the joiner's outbound queue so the hub can replay the
    /// transcript to it, and an acknowledgement fired once that replay
    /// has been queued.
    Join {
        peer: Peer,
        replayed: oneshot::Sender<()>,
    },
    /// A chat line from an active session
    Chat,
    /// A session disconnected
    Leave,
}

/// One entry of the global chat stream
#[derive(Debug)]
pub struct Event {
    pub kind: EventKind,
    /// Rendered text, identical for the transcript and for recipients
    pub text: String,
    /// Connection that produced the event, excluded from fan-out
    pub origin: ClientId,
    /// Captured when the event was built
    pub at: Timestamp,
}

impl Event {
    /// Join event for `name`; the receiver resolves once history was replayed
    pub fn join(peer: Peer, name: &str) -> (Self, oneshot::Receiver<()>) {
        let (replayed, ack) = oneshot::channel();
        let origin = peer.id;
        let event = Self {
            kind: EventKind::Join { peer, replayed },
            text: message::joined(name),
            origin,
            at: Timestamp::now(),
        };
        (event, ack)
    }

    /// Chat event rendered as `[<time>][<name>]: <text>`
    pub fn chat(origin: ClientId, name: &str, text: &str) -> Self {
        let at = Timestamp::now();
        Self {
            kind: EventKind::Chat,
            text: message::chat_line(&at, name, text),
            origin,
            at,
        }
    }

    pub fn leave(origin: ClientId, name: &str) -> Self {
        Self {
            kind: EventKind::Leave,
            text: message::left(name),
            origin,
            at: Timestamp::now(),
        }
    }

    /// Short tag used in log lines
    pub fn label(&self) -> &'static str {
        match self.kind {
            EventKind::Join { .. } => "join",
            EventKind::Chat => "chat",
            EventKind::Leave => "leave",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_event_text() {
        let origin = ClientId::new();
        let event = Event::chat(origin, "alice", "hi all");

        assert_eq!(event.origin, origin);
        assert_eq!(event.label(), "chat");
        assert_eq!(event.text, format!("[{}][alice]: hi all", event.at));
    }

    #[test]
    fn test_join_event_carries_peer() {
        let (peer, _rx) = Peer::channel(ClientId::new());
        let id = peer.id;
        let (event, _ack) = Event::join(peer, "bob");

        assert_eq!(event.origin, id);
        assert_eq!(event.text, "bob joined chat");
        assert!(matches!(event.kind, EventKind::Join { .. }));
    }

    #[test]
    fn test_leave_event_text() {
        let event = Event::leave(ClientId::new(), "carol");
        assert_eq!(event.text, "carol has left chat...");
        assert_eq!(event.label(), "leave");
    }
}
