//! Per-connection tasks: the read-loop and the writer.
//!
//! Each admitted connection gets two Tokio tasks:
//!   1. the read-loop owns the [`SessionGuard`], relays every inbound line,
//!      and tears the session down when it returns
//!   2. the writer drains the session's outbound queue into the socket and
//!      closes it once the session is evicted or torn down

use std::fmt;
use std::sync::Arc;

use relaychat_session::{OutboundQueue, SessionGuard};
use relaychat_transport::{Connection, TcpLineConnection};

use crate::RelayError;

/// Why a read-loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// The client closed its end of the stream.
    PeerClosed,
    /// The session was evicted (slow reader or failed write).
    Evicted,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed the connection"),
            Self::Evicted => write!(f, "evicted"),
        }
    }
}

/// Spawns the read-loop and writer for an admitted session.
pub(crate) fn spawn_session(conn: TcpLineConnection, guard: SessionGuard, queue: OutboundQueue) {
    let conn = Arc::new(conn);

    tokio::spawn(write_loop(Arc::clone(&conn), queue));
    tokio::spawn(async move {
        let client_id = guard.id();
        match read_loop(&conn, &guard).await {
            Ok(reason) => tracing::info!(%client_id, %reason, "client disconnected"),
            Err(e) => tracing::debug!(%client_id, error = %e, "client disconnected after error"),
        }
        // `guard` drops here → removal and leave notice.
    });
}

/// Relays lines from `conn` until the peer goes away or the session is
/// evicted. Each line is fully broadcast before the next read.
async fn read_loop(conn: &TcpLineConnection, guard: &SessionGuard) -> Result<CloseReason, RelayError> {
    let client_id = guard.id();

    loop {
        let received = tokio::select! {
            _ = guard.evicted() => return Ok(CloseReason::Evicted),
            received = conn.recv() => received?,
        };
        let Some(line) = received else {
            return Ok(CloseReason::PeerClosed);
        };

        let report = guard.relay(&line);
        tracing::debug!(%client_id, %line, delivered = report.delivered, "relayed line");
    }
}

/// Writes queued lines to `conn` in order, one whole line at a time.
async fn write_loop(conn: Arc<TcpLineConnection>, mut queue: OutboundQueue) {
    let client_id = queue.id();

    while let Some(line) = queue.next().await {
        let sent = tokio::select! {
            // A client that stopped reading can block a write forever.
            _ = queue.evicted() => break,
            sent = conn.send(&line) => sent,
        };
        if let Err(e) = sent {
            tracing::debug!(%client_id, error = %e, "write failed");
            queue.evict();
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%client_id, error = %e, "close failed");
    }
}
