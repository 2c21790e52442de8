//! Plain TCP transport framed into lines with `tokio-util`'s `LinesCodec`.

use std::io::ErrorKind;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::{Connection, Transport, TransportError};

/// Longest line accepted from a peer, in bytes, unless configured otherwise.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// A TCP [`Transport`] that listens for incoming line-oriented connections.
pub struct TcpLineTransport {
    listener: TcpListener,
    max_line_length: usize,
}

impl TcpLineTransport {
    /// Binds a new transport to the given address with the default line limit.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        Self::bind_with_max_line_length(addr, DEFAULT_MAX_LINE_LENGTH).await
    }

    /// Binds a new transport; accepted connections reject lines longer than
    /// `max_line_length` bytes.
    pub async fn bind_with_max_line_length(
        addr: impl ToSocketAddrs,
        max_line_length: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local = listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr = %local, max_line_length, "TCP line transport listening");
        Ok(Self {
            listener,
            max_line_length,
        })
    }
}

impl Transport for TcpLineTransport {
    type Connection = TcpLineConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        tracing::debug!(%peer, "accepted TCP connection");
        Ok(TcpLineConnection::from_stream(
            stream,
            peer,
            self.max_line_length,
        ))
    }

    fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// A single line-framed TCP connection.
///
/// The read and write halves sit behind separate locks, so a task blocked
/// in `recv` never holds up a `send` from another task. Each `send` writes
/// and flushes one complete line while holding the write lock.
pub struct TcpLineConnection {
    peer: SocketAddr,
    max_line_length: usize,
    reader: Mutex<FramedRead<OwnedReadHalf, LinesCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
}

impl TcpLineConnection {
    /// Opens an outgoing connection to `addr` (e.g. `"localhost:3314"`).
    pub async fn connect(
        addr: &str,
        max_line_length: usize,
    ) -> Result<Self, TransportError> {
        let connect_failed = |source| TransportError::ConnectFailed {
            addr: addr.to_string(),
            source,
        };
        let stream = TcpStream::connect(addr).await.map_err(connect_failed)?;
        let peer = stream.peer_addr().map_err(connect_failed)?;
        tracing::debug!(%peer, "connected");
        Ok(Self::from_stream(stream, peer, max_line_length))
    }

    fn from_stream(
        stream: TcpStream,
        peer: SocketAddr,
        max_line_length: usize,
    ) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();
        Self {
            peer,
            max_line_length,
            reader: Mutex::new(FramedRead::new(
                read_half,
                LinesCodec::new_with_max_length(max_line_length),
            )),
            writer: Mutex::new(FramedWrite::new(write_half, LinesCodec::new())),
        }
    }

    /// Returns the longest line this connection accepts from its peer.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn send_error(&self, e: std::io::Error) -> TransportError {
        match e.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected => TransportError::ConnectionClosed(self.peer.to_string()),
            _ => TransportError::SendFailed(e),
        }
    }
}

impl Connection for TcpLineConnection {
    type Error = TransportError;

    async fn send(&self, line: &str) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .send(line)
            .await
            .map_err(|e| match e {
                LinesCodecError::Io(e) => self.send_error(e),
                LinesCodecError::MaxLineLengthExceeded => {
                    TransportError::LineTooLong(self.max_line_length)
                }
            })
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        match self.reader.lock().await.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                Err(TransportError::LineTooLong(self.max_line_length))
            }
            Some(Err(LinesCodecError::Io(e))) => {
                Err(TransportError::ReceiveFailed(e))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .get_mut()
            .shutdown()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
