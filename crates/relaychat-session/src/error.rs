//! Error types for the session layer.

use relaychat_protocol::ClientId;

use crate::SessionState;

/// Errors that can occur during session management.
///
/// Delivery errors are per-recipient: a broadcast counts them and moves on
/// to the next session rather than failing as a whole.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The recipient's outbound queue is full. The recipient is evicted.
    #[error("outbound queue full for {0}")]
    QueueFull(ClientId),

    /// The recipient's writer has already stopped.
    #[error("{0} is no longer connected")]
    Disconnected(ClientId),

    /// A lifecycle transition that skips or reverses a state.
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ClientId,
        from: SessionState,
        to: SessionState,
    },
}
