//! Unified error type for the relay.

use std::path::PathBuf;

use relaychat_protocol::ProtocolError;
use relaychat_session::SessionError;
use relaychat_transport::TransportError;

/// Boxed cause of a configuration failure (unreadable file or bad JSON).
pub type ConfigSource = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` lift layer errors without ceremony.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A server line that could not be understood.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (delivery, lifecycle).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration file could not be loaded.
    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigSource,
    },

    /// Console or other local I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
