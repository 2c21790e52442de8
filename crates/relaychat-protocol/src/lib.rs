//! Wire protocol for relaychat.
//!
//! The protocol is deliberately bare: every message is one UTF-8 line of
//! text. This crate gives those lines names:
//!
//! - **Types** ([`ClientId`], [`ServerLine`], [`Recipient`]) — who a line is
//!   from, what it says, and who should get it.
//! - **Commands** ([`is_quit_command`]) — the one client-side convention.
//! - **Errors** ([`ProtocolError`]) — what can go wrong parsing a line back.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (framed lines) and session
//! (registered clients). It knows nothing about sockets or locks.
//!
//! ```text
//! Transport (lines) → Protocol (ServerLine) → Session (registry, broadcast)
//! ```

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{ClientId, QUIT_COMMAND, Recipient, ServerLine, is_quit_command};
