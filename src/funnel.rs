//! Event funnel
//!
//! Join, chat and leave events from every session converge on one queue
//! drained by the single hub task. Session workers hold a cloneable
//! `Funnel`; the hub owns the one `FunnelReceiver`.

use tokio::sync::mpsc;

use crate::error::AppError;
use crate::event::Event;

/// Sending side, cloned into every session worker
#[derive(Debug, Clone)]
pub struct Funnel {
    sender: mpsc::Sender<Event>,
}

/// Receiving side, owned by the broadcast hub
#[derive(Debug)]
pub struct FunnelReceiver {
    receiver: mpsc::Receiver<Event>,
}

/// Create a funnel buffering up to `buffer` events
pub fn channel(buffer: usize) -> (Funnel, FunnelReceiver) {
    let (sender, receiver) = mpsc::channel(buffer);
    (Funnel { sender }, FunnelReceiver { receiver })
}

impl Funnel {
    /// Queue `event` behind everything submitted before it
    pub async fn submit(&self, event: Event) -> Result<(), AppError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| AppError::FunnelClosed)
    }
}

impl FunnelReceiver {
    /// Next event in arrival order, whatever its kind
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Peer;
    use crate::types::ClientId;

    #[tokio::test]
    async fn test_routes_all_kinds() {
        let (funnel, mut rx) = channel(8);
        let id = ClientId::new();
        let (peer, _out) = Peer::channel(id);
        let (join, _ack) = Event::join(peer, "alice");

        funnel.submit(join).await.unwrap();
        funnel.submit(Event::chat(id, "alice", "hi")).await.unwrap();
        funnel.submit(Event::leave(id, "alice")).await.unwrap();

        let labels: Vec<&str> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(Event::label)
        .collect();
        assert_eq!(labels, vec!["join", "chat", "leave"]);
    }

    #[tokio::test]
    async fn test_leave_not_overtaken_by_later_chats() {
        let (funnel, mut rx) = channel(256);
        let talker = ClientId::new();
        let quitter = ClientId::new();

        for i in 0..100 {
            funnel.submit(Event::chat(talker, "talker", &i.to_string())).await.unwrap();
        }
        funnel.submit(Event::leave(quitter, "quitter")).await.unwrap();
        for i in 100..200 {
            funnel.submit(Event::chat(talker, "talker", &i.to_string())).await.unwrap();
        }
        drop(funnel);

        let mut labels = Vec::new();
        while let Some(event) = rx.recv().await {
            labels.push(event.label());
        }
        assert_eq!(labels.len(), 201);
        assert_eq!(labels.iter().position(|l| *l == "leave"), Some(100));
    }

    #[tokio::test]
    async fn test_join_after_chat_keeps_arrival_order() {
        let (funnel, mut rx) = channel(8);
        let alice = ClientId::new();
        let (bob, _out) = Peer::channel(ClientId::new());

        funnel.submit(Event::chat(alice, "alice", "before bob")).await.unwrap();
        let (join, _ack) = Event::join(bob, "bob");
        funnel.submit(join).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().label(), "chat");
        assert_eq!(rx.recv().await.unwrap().label(), "join");
    }

    #[tokio::test]
    async fn test_recv_none_when_senders_dropped() {
        let (funnel, mut rx) = channel(8);
        drop(funnel);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_submit_fails_when_hub_gone() {
        let (funnel, rx) = channel(8);
        drop(rx);
        let result = funnel.submit(Event::chat(ClientId::new(), "x", "y")).await;
        assert!(matches!(result, Err(AppError::FunnelClosed)));
    }
}
