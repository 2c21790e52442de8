//! Sequential identity allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use relaychat_protocol::ClientId;

/// Hands out `User1`, `User2`, ... in accept order.
///
/// Numbers are never reused for the life of the process, so two sessions
/// can never share an identity even if one is still tearing down.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first identity is `User1`.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh identity.
    pub fn next_id(&self) -> ClientId {
        ClientId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
