//! Core protocol types: identities, server lines, and recipients.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The identity of one connected client.
///
/// A newtype over the sequential number the server hands out on accept.
/// Its display form is the identity string other users see: `ClientId(3)`
/// prints as `User3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

const IDENTITY_PREFIX: &str = "User";

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IDENTITY_PREFIX}{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(IDENTITY_PREFIX)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ProtocolError::InvalidIdentity(s.to_string()))?;
        digits
            .parse()
            .map(ClientId)
            .map_err(|_| ProtocolError::InvalidIdentity(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who a broadcast is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every registered client. Used for leave notices, whose subject is
    /// already gone from the registry.
    All,

    /// Everyone except the given client. Used for chat lines and join
    /// notices so a client never hears its own message.
    AllExcept(ClientId),
}

impl Recipient {
    /// Returns `true` if `id` should receive a message addressed this way.
    pub fn includes(self, id: ClientId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => excluded != id,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerLine
// ---------------------------------------------------------------------------

/// A line the server sends to clients.
///
/// `Display` renders the exact wire text (without the trailing newline):
///
/// ```text
/// User1 has joined.
/// User1 has left.
/// [User1]: hello
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// A client was registered.
    Joined(ClientId),
    /// A client was removed.
    Left(ClientId),
    /// A line of chat text, tagged with its sender.
    Chat { from: ClientId, text: String },
}

const JOINED_SUFFIX: &str = " has joined.";
const LEFT_SUFFIX: &str = " has left.";
const CHAT_TAG_END: &str = "]: ";

impl ServerLine {
    /// Shorthand for a chat line.
    pub fn chat(from: ClientId, text: impl Into<String>) -> Self {
        Self::Chat {
            from,
            text: text.into(),
        }
    }
}

impl fmt::Display for ServerLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined(id) => write!(f, "{id}{JOINED_SUFFIX}"),
            Self::Left(id) => write!(f, "{id}{LEFT_SUFFIX}"),
            Self::Chat { from, text } => write!(f, "[{from}{CHAT_TAG_END}{text}"),
        }
    }
}

impl FromStr for ServerLine {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let unrecognized = || ProtocolError::UnrecognizedLine(line.to_string());

        if let Some(rest) = line.strip_prefix('[') {
            // Identities never contain `]`, so the first tag end is the real one.
            let (from, text) = rest.split_once(CHAT_TAG_END).ok_or_else(unrecognized)?;
            return Ok(Self::chat(from.parse()?, text));
        }
        if let Some(id) = line.strip_suffix(JOINED_SUFFIX) {
            return Ok(Self::Joined(id.parse()?));
        }
        if let Some(id) = line.strip_suffix(LEFT_SUFFIX) {
            return Ok(Self::Left(id.parse()?));
        }
        Err(unrecognized())
    }
}

// ---------------------------------------------------------------------------
// Client commands
// ---------------------------------------------------------------------------

/// The line a client types to leave the chat.
pub const QUIT_COMMAND: &str = "quit";

/// Returns `true` if `line` is the quit command, ignoring ASCII case.
///
/// Only the client acts on this. The server relays `quit` like any other
/// line and notices the departure when the connection closes.
pub fn is_quit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case(QUIT_COMMAND)
}
