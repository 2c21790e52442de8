//! The registry: the set of sessions currently connected.
//!
//! A session is a member from the moment the acceptor registers it until
//! its own teardown removes it. Nothing else mutates the set; broadcasts
//! only read it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use relaychat_protocol::{ClientId, Recipient};

use crate::SessionHandle;

/// Shared, lock-guarded set of live sessions, keyed by identity.
///
/// Uses a `std::sync::Mutex` rather than an async one: every critical
/// section is a few map operations plus non-blocking queue pushes, and the
/// lock is never held across an `.await`. That also lets removal run from
/// a synchronous `Drop`.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<HashMap<ClientId, SessionHandle>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session. The caller guarantees the identity is fresh.
    pub fn add(&self, handle: SessionHandle) {
        let id = handle.id();
        let previous = self.lock().insert(id, handle);
        debug_assert!(previous.is_none(), "{id} registered twice");
        tracing::debug!(client_id = %id, "session registered");
    }

    /// Removes a session if present.
    ///
    /// Returns the removed handle, or `None` if the session was not (or no
    /// longer) registered. Removing twice is harmless; only the first call
    /// gets `Some`.
    pub fn remove(&self, id: ClientId) -> Option<SessionHandle> {
        let removed = self.lock().remove(&id);
        if removed.is_some() {
            tracing::debug!(client_id = %id, "session removed");
        }
        removed
    }

    /// Calls `f` once for every registered session addressed by `recipient`.
    ///
    /// The lock is held for the whole iteration, so `f` sees one consistent
    /// membership snapshot. `f` must not block and must not call back into
    /// the registry.
    pub fn for_each_recipient(&self, recipient: Recipient, f: impl FnMut(&SessionHandle)) {
        let sessions = self.lock();
        sessions
            .values()
            .filter(|handle| recipient.includes(handle.id()))
            .for_each(f);
    }

    /// Returns `true` if `id` is currently registered.
    pub fn contains(&self, id: ClientId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Returns the registered identities in ascending order.
    pub fn identities(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (every critical section is a single map call), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
