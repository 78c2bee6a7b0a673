//! Session registry and admission control
//!
//! The registry maps each live connection to its display name and owns the
//! admission counter. Both sit behind one lock so a connection can never be
//! observed as admitted and removed at the same time.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::NameRejected;
use crate::types::ClientId;

/// Maximum number of concurrently admitted connections
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Default)]
struct Inner {
    /// Live sessions in registration order
    sessions: IndexMap<ClientId, String>,
    /// Connections admitted and not yet torn down, negotiating ones included
    admitted: usize,
}

/// Shared registry of named sessions plus the admission counter
#[derive(Debug)]
pub struct Registry {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Registry {
    /// Create an empty registry admitting at most `capacity` connections
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
        }
    }

    /// Take an admission slot for a freshly accepted connection
    ///
    /// The counter is incremented first; if that pushes it past capacity
    /// it is decremented again and `None` is returned.
    pub fn admit(self: &Arc<Self>) -> Option<Admission> {
        if self.acquire_slot() {
            Some(Admission {
                registry: Arc::clone(self),
                held: true,
            })
        } else {
            None
        }
    }

    /// Number of connections currently holding an admission slot
    pub fn admitted(&self) -> usize {
        self.inner.lock().admitted
    }

    /// Claim `name` for `id`
    ///
    /// Fails without touching the registry if the name is blank or held by
    /// another live session. Check and insert happen under one lock, so of
    /// two racing claims for the same name exactly one wins.
    pub fn try_register(&self, id: ClientId, name: &str) -> Result<(), NameRejected> {
        if name.trim().is_empty() {
            return Err(NameRejected::Invalid);
        }

        let mut inner = self.inner.lock();
        if inner.sessions.values().any(|held| held == name) {
            return Err(NameRejected::Taken(name.to_string()));
        }
        inner.sessions.insert(id, name.to_string());
        debug!("Registered {} as '{}' ({} live)", id, name, inner.sessions.len());
        Ok(())
    }

    /// Remove the session for `id`, returning its name if it was present
    pub fn unregister(&self, id: ClientId) -> Option<String> {
        self.inner.lock().sessions.shift_remove(&id)
    }

    /// Copy of all live sessions, in registration order
    pub fn snapshot(&self) -> Vec<(ClientId, String)> {
        self.inner
            .lock()
            .sessions
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect()
    }

    pub fn name_of(&self, id: ClientId) -> Option<String> {
        self.inner.lock().sessions.get(&id).cloned()
    }

    /// Number of live named sessions
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire_slot(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.admitted += 1;
        if inner.admitted > self.capacity {
            inner.admitted -= 1;
            return false;
        }
        true
    }

    fn reclaim_slot(&self) {
        self.inner.lock().admitted += 1;
    }

    fn release_slot(&self) {
        let mut inner = self.inner.lock();
        inner.admitted = inner.admitted.saturating_sub(1);
    }

    /// Release a slot and drop the session in a single critical section
    fn depart(&self, id: ClientId) -> Option<String> {
        let mut inner = self.inner.lock();
        inner.admitted = inner.admitted.saturating_sub(1);
        inner.sessions.shift_remove(&id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// RAII admission slot held by one connection worker
///
/// Dropping a held slot gives it back, so a worker that exits on any path
/// (disconnect while negotiating included) never leaks capacity.
#[derive(Debug)]
pub struct Admission {
    registry: Arc<Registry>,
    held: bool,
}

impl Admission {
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Give the slot back while the connection stays open
    pub fn release(&mut self) {
        if self.held {
            self.registry.release_slot();
            self.held = false;
        }
    }

    /// Count this connection again after `release`
    ///
    /// The connection was already admitted at accept time, so this never
    /// checks capacity and never refuses.
    pub fn readmit(&mut self) {
        if !self.held {
            self.registry.reclaim_slot();
            self.held = true;
        }
    }

    /// Terminal teardown: release the slot and unregister `id` together
    pub fn depart(&mut self, id: ClientId) -> Option<String> {
        if self.held {
            self.held = false;
            self.registry.depart(id)
        } else {
            self.registry.unregister(id)
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if self.held {
            self.registry.release_slot();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unique_names() {
        let registry = Registry::default();
        let alice = ClientId::new();
        let other = ClientId::new();

        assert!(registry.try_register(alice, "alice").is_ok());
        assert_eq!(
            registry.try_register(other, "alice"),
            Err(NameRejected::Taken("alice".to_string()))
        );

        // Failed claim must not mutate the registry
        assert_eq!(registry.snapshot(), vec![(alice, "alice".to_string())]);
    }

    #[test]
    fn test_register_rejects_blank_names() {
        let registry = Registry::default();

        assert_eq!(registry.try_register(ClientId::new(), ""), Err(NameRejected::Invalid));
        assert_eq!(registry.try_register(ClientId::new(), " "), Err(NameRejected::Invalid));
        assert_eq!(registry.try_register(ClientId::new(), "\t\n"), Err(NameRejected::Invalid));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_idempotent() {
        let registry = Registry::default();
        let id = ClientId::new();
        registry.try_register(id, "bob").unwrap();

        assert_eq!(registry.unregister(id), Some("bob".to_string()));
        assert_eq!(registry.unregister(id), None);
        assert!(registry.is_empty());

        // Name is free again
        assert!(registry.try_register(ClientId::new(), "bob").is_ok());
    }

    #[test]
    fn test_snapshot_keeps_registration_order() {
        let registry = Registry::default();
        let ids: Vec<ClientId> = (0..4).map(|_| ClientId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            registry.try_register(*id, &format!("user{}", i)).unwrap();
        }
        registry.unregister(ids[1]);

        let names: Vec<String> = registry.snapshot().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["user0", "user2", "user3"]);
        assert_eq!(registry.name_of(ids[2]).as_deref(), Some("user2"));
    }

    #[test]
    fn test_admission_capacity_boundary() {
        let registry = Arc::new(Registry::new(10));
        let slots: Vec<Admission> = (0..10).map(|_| registry.admit().unwrap()).collect();
        assert_eq!(registry.admitted(), 10);

        // 11th is refused and does not inflate the counter
        assert!(registry.admit().is_none());
        assert_eq!(registry.admitted(), 10);

        drop(slots);
        assert_eq!(registry.admitted(), 0);
    }

    #[test]
    fn test_release_and_readmit() {
        let registry = Arc::new(Registry::new(1));
        let mut slot = registry.admit().unwrap();

        slot.release();
        slot.release();
        assert!(!slot.is_held());
        assert_eq!(registry.admitted(), 0);

        // Someone else grabs the freed slot; readmission still succeeds
        let other = registry.admit().unwrap();
        slot.readmit();
        slot.readmit();
        assert!(slot.is_held());
        assert_eq!(registry.admitted(), 2);

        // New connections stay refused until the count drops below capacity
        assert!(registry.admit().is_none());
        drop(other);
        assert!(registry.admit().is_none());
        drop(slot);
        assert_eq!(registry.admitted(), 0);
    }

    #[test]
    fn test_depart_releases_and_unregisters() {
        let registry = Arc::new(Registry::default());
        let id = ClientId::new();
        let mut slot = registry.admit().unwrap();
        registry.try_register(id, "carol").unwrap();

        assert_eq!(slot.depart(id), Some("carol".to_string()));
        assert_eq!(registry.admitted(), 0);
        assert!(registry.is_empty());

        // A second teardown changes nothing
        assert_eq!(slot.depart(id), None);
        drop(slot);
        assert_eq!(registry.admitted(), 0);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let registry = Registry::default();
        let wins = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.try_register(ClientId::new(), "dave").is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }
}
