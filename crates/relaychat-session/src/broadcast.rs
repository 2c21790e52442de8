//! Broadcast fan-out and the admitted-session guard.
//!
//! [`Broadcaster::broadcast`] renders a line once and pushes it into the
//! queue of every addressed session. [`Broadcaster::admit`] registers a new
//! session and returns a [`SessionGuard`] whose drop undoes the
//! registration, so teardown runs however the read-loop ends.

use std::sync::Arc;

use relaychat_protocol::{ClientId, Recipient, ServerLine};
use tokio_util::sync::WaitForCancellationFuture;

use crate::{ClientSession, OutboundLine, Registry, SessionError, SessionState};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients whose queue accepted the line.
    pub delivered: usize,
    /// Recipients that were skipped (queue full or already closed).
    pub dropped: usize,
}

/// Delivers lines to sessions in a shared [`Registry`]. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// Creates a broadcaster over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster delivers to.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Delivers `line` to every registered session addressed by `recipient`.
    ///
    /// A failure for one recipient never stops delivery to the rest. A
    /// recipient with a full queue is evicted; its own read-loop notices
    /// and removes it.
    pub fn broadcast(&self, line: &ServerLine, recipient: Recipient) -> BroadcastReport {
        let rendered: OutboundLine = Arc::from(line.to_string());
        let mut report = BroadcastReport::default();

        self.registry.for_each_recipient(recipient, |handle| {
            match handle.deliver(Arc::clone(&rendered)) {
                Ok(()) => report.delivered += 1,
                Err(e @ SessionError::QueueFull(_)) => {
                    report.dropped += 1;
                    tracing::warn!(client_id = %handle.id(), error = %e, "evicting slow client");
                }
                Err(e) => {
                    report.dropped += 1;
                    tracing::debug!(client_id = %handle.id(), error = %e, "dropped line");
                }
            }
        });

        report
    }

    /// Registers `session`, announces it to everyone else, and marks it
    /// `Active`.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] if the session is not
    /// in `Connecting`.
    pub fn admit(&self, mut session: ClientSession) -> Result<SessionGuard, SessionError> {
        let id = session.id();
        session.advance(SessionState::Active)?;
        self.registry.add(session.handle().clone());

        let report = self.broadcast(&ServerLine::Joined(id), Recipient::AllExcept(id));
        tracing::info!(client_id = %id, notified = report.delivered, "client joined");

        Ok(SessionGuard {
            session,
            broadcaster: self.clone(),
        })
    }
}

/// An admitted, registered session.
///
/// Dropping the guard is the session's teardown: it moves to `Closing`,
/// evicts the session so its writer stops and closes the socket, removes it
/// from the registry, and, if that removal actually happened, broadcasts
/// the leave notice to everyone. The guard then ends in `Closed`.
#[derive(Debug)]
pub struct SessionGuard {
    session: ClientSession,
    broadcaster: Broadcaster,
}

impl SessionGuard {
    /// The session's identity.
    pub fn id(&self) -> ClientId {
        self.session.id()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Relays one line of chat text from this session to everyone else.
    pub fn relay(&self, text: &str) -> BroadcastReport {
        let id = self.id();
        self.broadcaster
            .broadcast(&ServerLine::chat(id, text), Recipient::AllExcept(id))
    }

    /// Resolves when this session is evicted.
    pub fn evicted(&self) -> WaitForCancellationFuture<'_> {
        self.session.handle().evicted()
    }

    /// Returns `true` if this session has been evicted.
    pub fn is_evicted(&self) -> bool {
        self.session.handle().is_evicted()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let id = self.session.id();
        if let Err(e) = self.session.advance(SessionState::Closing) {
            tracing::debug!(client_id = %id, error = %e, "unexpected state at teardown");
        }
        self.session.handle().evict();

        if self.broadcaster.registry.remove(id).is_some() {
            let report = self.broadcaster.broadcast(&ServerLine::Left(id), Recipient::All);
            tracing::info!(client_id = %id, notified = report.delivered, "client left");
        }

        if let Err(e) = self.session.advance(SessionState::Closed) {
            tracing::debug!(client_id = %id, error = %e, "unexpected state at teardown");
        }
    }
}
