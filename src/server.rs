//! Broadcast hub actor
//!
//! The single task that drains the event funnel. For every event it
//! persists the rendered text to the transcript and fans it out to every
//! joined session except the originator. Because only this task consumes
//! events, the transcript and all clients observe one global order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::Peer;
use crate::event::{Event, EventKind};
use crate::funnel::FunnelReceiver;
use crate::message;
use crate::registry::Registry;
use crate::transcript::Transcript;
use crate::types::{ClientId, Timestamp};

/// The broadcast hub
///
/// Owns the transcript exclusively, so the file needs no lock of its own.
/// `peers` holds the outbound queue of every session whose join has been
/// processed; membership and names come from the shared registry.
pub struct ChatServer {
    registry: Arc<Registry>,
    transcript: Transcript,
    peers: HashMap<ClientId, Peer>,
    inbox: FunnelReceiver,
}

impl ChatServer {
    /// Create a hub reading from `inbox`
    pub fn new(registry: Arc<Registry>, transcript: Transcript, inbox: FunnelReceiver) -> Self {
        Self {
            registry,
            transcript,
            peers: HashMap::new(),
            inbox,
        }
    }

    /// Run the hub event loop
    ///
    /// Continuously receives and processes events until all senders are dropped.
    pub async fn run(mut self) {
        info!("Broadcast hub started");

        while let Some(event) = self.inbox.recv().await {
            self.handle_event(event).await;
        }

        info!("Broadcast hub shutting down");
    }

    /// Process a single event
    async fn handle_event(&mut self, event: Event) {
        debug!("Dispatching {} event from {}", event.label(), event.origin);
        let Event {
            kind,
            text,
            origin,
            at,
        } = event;

        match kind {
            EventKind::Join { peer, replayed } => {
                self.replay_to(&peer).await;
                self.peers.insert(origin, peer);
                // Session may already be gone; it will then send its own leave
                let _ = replayed.send(());
            }
            EventKind::Chat => {}
            EventKind::Leave => {
                self.peers.remove(&origin);
            }
        }

        self.persist(&text).await;
        self.fan_out(origin, &text, &at);
    }

    /// Queue the full transcript to a joining session
    async fn replay_to(&self, peer: &Peer) {
        match self.transcript.read_all().await {
            Ok(history) if history.is_empty() => {}
            Ok(history) => {
                if peer.send(history).is_err() {
                    debug!("Client {} gone before replay", peer.id);
                }
            }
            Err(e) => warn!(
                "Failed to read transcript {}: {}",
                self.transcript.path().display(),
                e
            ),
        }
    }

    /// Best-effort append; failures never hold up delivery
    async fn persist(&mut self, text: &str) {
        if let Err(e) = self.transcript.append(text).await {
            warn!(
                "Failed to append to transcript {}: {}",
                self.transcript.path().display(),
                e
            );
        }
    }

    /// Deliver `text` to every joined session except `origin`
    fn fan_out(&self, origin: ClientId, text: &str, at: &Timestamp) {
        for (id, name) in self.registry.snapshot() {
            if id == origin {
                continue;
            }
            let Some(peer) = self.peers.get(&id) else {
                // Registered but join not processed yet
                continue;
            };
            if peer.send(message::broadcast_frame(text, at, &name)).is_err() {
                debug!("Dropping broadcast to {} ({}): writer closed", name, id);
            }
        }
    }
}
