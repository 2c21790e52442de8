//! Transport abstraction layer for relaychat.
//!
//! Provides the [`Transport`] and [`Connection`] traits. A connection moves
//! whole lines of text: framing on `\n` happens here, so the layers above
//! never see partial reads.
//!
//! The only implementation is [`TcpLineTransport`] / [`TcpLineConnection`],
//! plain TCP framed with `tokio_util`'s `LinesCodec`.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{DEFAULT_MAX_LINE_LENGTH, TcpLineConnection, TcpLineTransport};

use std::net::SocketAddr;

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// A single connection that exchanges newline-terminated text lines.
///
/// The read and write sides are independent: one task may sit in
/// [`recv`](Self::recv) while another calls [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one line to the remote peer. The terminator is appended here.
    async fn send(&self, line: &str) -> Result<(), Self::Error>;

    /// Receives the next line from the remote peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the peer cleanly closes the stream.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the write side of the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
