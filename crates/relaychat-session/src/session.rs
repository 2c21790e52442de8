//! Session types: one connected client and its outbound queue.
//!
//! A session pairs an identity with a [`SessionHandle`], the cloneable
//! sending side of a bounded queue. The registry stores handles and any
//! broadcasting task may push into them. The receiving side, an
//! [`OutboundQueue`], belongs to exactly one writer task, which is the only
//! thing that ever writes to the client's socket. One writer per socket is
//! what keeps two messages from interleaving on the wire.

use std::fmt;
use std::sync::Arc;

use relaychat_protocol::ClientId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::SessionError;

/// A fully rendered line waiting to be written. Shared between every
/// recipient of the same broadcast.
pub type OutboundLine = Arc<str>;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many lines may wait in a client's outbound queue. A client that
    /// falls this far behind is evicted instead of stalling broadcasts.
    ///
    /// Default: 64.
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// Transitions are strictly ordered:
///
/// ```text
/// Connecting → Active → Closing → Closed
/// ```
///
/// - **Connecting**: accepted and named, not yet registered.
/// - **Active**: registered, join notice sent, lines are being relayed.
/// - **Closing**: the read-loop ended (peer closed, I/O error, eviction);
///   resources are being released.
/// - **Closed**: removed from the registry, leave notice sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    /// Returns the state that follows this one, or `None` from `Closed`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Active),
            Self::Active => Some(Self::Closing),
            Self::Closing => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Active => write!(f, "Active"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandle / OutboundQueue
// ---------------------------------------------------------------------------

/// The shared, sending side of a session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: ClientId,
    sender: mpsc::Sender<OutboundLine>,
    evicted: CancellationToken,
}

impl SessionHandle {
    /// The identity of the session this handle delivers to.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Queues one line for the session's writer without waiting.
    ///
    /// # Errors
    /// - [`SessionError::QueueFull`] — the client is too far behind. The
    ///   session is evicted as a side effect.
    /// - [`SessionError::Disconnected`] — the writer has already stopped.
    pub fn deliver(&self, line: OutboundLine) -> Result<(), SessionError> {
        match self.sender.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.evict();
                Err(SessionError::QueueFull(self.id))
            }
            Err(TrySendError::Closed(_)) => Err(SessionError::Disconnected(self.id)),
        }
    }

    /// Signals the session's read-loop and writer to stop.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    /// Returns `true` once [`evict`](Self::evict) has been called.
    pub fn is_evicted(&self) -> bool {
        self.evicted.is_cancelled()
    }

    /// Resolves when the session is evicted.
    pub fn evicted(&self) -> WaitForCancellationFuture<'_> {
        self.evicted.cancelled()
    }
}

/// The receiving side of a session's outbound queue, owned by its writer.
#[derive(Debug)]
pub struct OutboundQueue {
    id: ClientId,
    receiver: mpsc::Receiver<OutboundLine>,
    evicted: CancellationToken,
}

impl OutboundQueue {
    /// The identity of the session this queue belongs to.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Waits for the next line to write.
    ///
    /// Returns `None` once the session is evicted or torn down, even if
    /// lines are still queued: nobody is left to read them.
    pub async fn next(&mut self) -> Option<OutboundLine> {
        tokio::select! {
            biased;
            _ = self.evicted.cancelled() => None,
            line = self.receiver.recv() => line,
        }
    }

    /// Takes the next queued line without waiting, ignoring eviction.
    pub fn try_next(&mut self) -> Option<OutboundLine> {
        self.receiver.try_recv().ok()
    }

    /// Stops the session from the writer side, e.g. after a failed write.
    pub fn evict(&self) {
        self.evicted.cancel();
    }

    /// Resolves when the session is evicted. Lets the writer abandon a
    /// write that is stuck on a client that stopped reading.
    pub fn evicted(&self) -> WaitForCancellationFuture<'_> {
        self.evicted.cancelled()
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// Server-side state for one connected client.
///
/// Created in [`SessionState::Connecting`]. Admitting it through a
/// [`Broadcaster`](crate::Broadcaster) registers it and makes it `Active`.
#[derive(Debug)]
pub struct ClientSession {
    id: ClientId,
    state: SessionState,
    handle: SessionHandle,
}

impl ClientSession {
    /// Creates a session and its outbound queue.
    ///
    /// The queue must be handed to a writer task; the session goes to the
    /// task that reads from the client.
    pub fn new(id: ClientId, config: &SessionConfig) -> (Self, OutboundQueue) {
        // A zero-capacity channel panics in tokio; one slot is the floor.
        let (sender, receiver) = mpsc::channel(config.outbound_capacity.max(1));
        let evicted = CancellationToken::new();

        let session = Self {
            id,
            state: SessionState::Connecting,
            handle: SessionHandle {
                id,
                sender,
                evicted: evicted.clone(),
            },
        };
        let queue = OutboundQueue {
            id,
            receiver,
            evicted,
        };
        (session, queue)
    }

    /// The session's identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The shared sending side of this session.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Moves to `target`, which must be the next state.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] for any other target.
    pub fn advance(&mut self, target: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: target,
            });
        }
        tracing::trace!(client_id = %self.id, from = %self.state, to = %target, "session state");
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: u64, capacity: usize) -> (ClientSession, OutboundQueue) {
        ClientSession::new(
            ClientId(id),
            &SessionConfig {
                outbound_capacity: capacity,
            },
        )
    }

    // =====================================================================
    // SessionState
    // =====================================================================

    #[test]
    fn test_session_state_next_follows_strict_order() {
        assert_eq!(SessionState::Connecting.next(), Some(SessionState::Active));
        assert_eq!(SessionState::Active.next(), Some(SessionState::Closing));
        assert_eq!(SessionState::Closing.next(), Some(SessionState::Closed));
        assert_eq!(SessionState::Closed.next(), None);
    }

    #[test]
    fn test_session_state_can_transition_to() {
        assert!(SessionState::Connecting.can_transition_to(SessionState::Active));
        assert!(!SessionState::Connecting.can_transition_to(SessionState::Closing));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Active));
    }

    #[test]
    fn test_session_config_default() {
        assert_eq!(SessionConfig::default().outbound_capacity, 64);
    }

    // =====================================================================
    // ClientSession
    // =====================================================================

    #[test]
    fn test_new_session_starts_connecting() {
        let (s, queue) = session(1, 4);
        assert_eq!(s.state(), SessionState::Connecting);
        assert_eq!(s.id(), ClientId(1));
        assert_eq!(s.handle().id(), ClientId(1));
        assert_eq!(queue.id(), ClientId(1));
    }

    #[test]
    fn test_advance_rejects_skipped_state() {
        let (mut s, _queue) = session(1, 4);
        let result = s.advance(SessionState::Closed);
        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                from: SessionState::Connecting,
                to: SessionState::Closed,
                ..
            })
        ));
        assert_eq!(s.state(), SessionState::Connecting);
    }

    #[test]
    fn test_advance_walks_full_lifecycle() {
        let (mut s, _queue) = session(1, 4);
        s.advance(SessionState::Active).unwrap();
        s.advance(SessionState::Closing).unwrap();
        s.advance(SessionState::Closed).unwrap();
        assert_eq!(s.state(), SessionState::Closed);
    }

    // =====================================================================
    // SessionHandle / OutboundQueue
    // =====================================================================

    #[tokio::test]
    async fn test_deliver_preserves_order() {
        let (s, mut queue) = session(1, 8);
        for text in ["a", "b", "c"] {
            s.handle().deliver(Arc::from(text)).unwrap();
        }
        assert_eq!(queue.next().await.as_deref(), Some("a"));
        assert_eq!(queue.next().await.as_deref(), Some("b"));
        assert_eq!(queue.next().await.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_deliver_full_queue_evicts() {
        let (s, mut queue) = session(7, 2);
        let handle = s.handle().clone();
        handle.deliver(Arc::from("1")).unwrap();
        handle.deliver(Arc::from("2")).unwrap();

        let result = handle.deliver(Arc::from("3"));

        assert!(matches!(result, Err(SessionError::QueueFull(ClientId(7)))));
        assert!(handle.is_evicted());
        // The writer stops instead of draining for a client that fell behind.
        assert_eq!(queue.next().await, None);
    }

    #[tokio::test]
    async fn test_deliver_after_queue_dropped_reports_disconnected() {
        let (s, queue) = session(3, 2);
        drop(queue);

        let result = s.handle().deliver(Arc::from("late"));

        assert!(matches!(result, Err(SessionError::Disconnected(ClientId(3)))));
        assert!(!s.handle().is_evicted());
    }

    #[tokio::test]
    async fn test_queue_evict_wakes_handle_waiter() {
        let (s, queue) = session(1, 2);
        let handle = s.handle().clone();
        let waiter = tokio::spawn(async move { handle.evicted().await });

        queue.evict();

        waiter.await.expect("waiter should finish after eviction");
        assert!(s.handle().is_evicted());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (s, _queue) = session(1, 0);
        assert!(s.handle().deliver(Arc::from("fits")).is_ok());
    }
}
