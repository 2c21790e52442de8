//! Client session management for relaychat.
//!
//! This crate is the server's core: who is connected, and how a line from
//! one client reaches all the others.
//!
//! 1. **Identity** — sequential `User<n>` names ([`IdAllocator`])
//! 2. **Sessions** — per-client lifecycle and outbound queue
//!    ([`ClientSession`], [`SessionHandle`], [`OutboundQueue`])
//! 3. **Registry** — the shared set of live sessions ([`Registry`])
//! 4. **Broadcast** — fan-out of one line to every other session
//!    ([`Broadcaster`], [`SessionGuard`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← accepts connections, runs read-loops and writers
//!     ↕
//! Session Layer (this crate)  ← registry, broadcast, lifecycle
//!     ↕
//! Protocol Layer (below)  ← provides ClientId, ServerLine, Recipient
//! ```
//!
//! # Synchronization
//!
//! The [`Registry`] is the only shared mutable state. One mutex guards it,
//! and a broadcast delivers to every recipient while holding that mutex, so
//! each broadcast sees a consistent snapshot and never a half-applied add
//! or remove. Delivery is a non-blocking `try_send` into each recipient's
//! bounded queue, so the lock is never held across I/O or an `.await`.

mod broadcast;
mod error;
mod identity;
mod registry;
mod session;

pub use broadcast::{BroadcastReport, Broadcaster, SessionGuard};
pub use error::SessionError;
pub use identity::IdAllocator;
pub use registry::Registry;
pub use session::{
    ClientSession, OutboundLine, OutboundQueue, SessionConfig, SessionHandle, SessionState,
};
