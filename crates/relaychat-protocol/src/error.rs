//! Error types for the protocol layer.

/// Errors that can occur when interpreting a line of text.
///
/// Rendering a [`ServerLine`](crate::ServerLine) never fails; these only
/// come up when a client parses what the server sent.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The text is not a `User<n>` identity.
    #[error("invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// The line is neither a join notice, a leave notice, nor a chat line.
    #[error("unrecognized server line: {0:?}")]
    UnrecognizedLine(String),
}
