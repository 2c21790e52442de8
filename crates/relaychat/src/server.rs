//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → session → per-connection handler.

use std::net::SocketAddr;
use std::sync::Arc;

use relaychat_session::{Broadcaster, ClientSession, IdAllocator, Registry, SessionConfig};
use relaychat_transport::{Connection, TcpLineConnection, TcpLineTransport, Transport};

use crate::handler::spawn_session;
use crate::{RelayConfig, RelayError};

/// Port the server listens on and the client dials when none is given.
pub const DEFAULT_PORT: u16 = 3314;

/// State owned by the accept loop.
///
/// Per-connection tasks never see this; they get only their own
/// [`SessionGuard`](relaychat_session::SessionGuard) and queue.
struct ServerState {
    broadcaster: Broadcaster,
    ids: IdAllocator,
    session_config: SessionConfig,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:3314".parse()?)
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.listen = addr;
        self
    }

    /// Sets how many lines may wait for one client before it is evicted.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Sets the longest inbound line accepted, in bytes.
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.config.max_line_length = max;
        self
    }

    /// Binds the listener and returns a server ready to [`run`](RelayServer::run).
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let transport = TcpLineTransport::bind_with_max_line_length(
            self.config.listen,
            self.config.max_line_length,
        )
        .await?;

        let state = ServerState {
            broadcaster: Broadcaster::new(Arc::new(Registry::new())),
            ids: IdAllocator::new(),
            session_config: self.config.session_config(),
        };

        Ok(RelayServer { transport, state })
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: TcpLineTransport,
    state: ServerState,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    /// The set of currently connected sessions.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(self.state.broadcaster.registry())
    }

    /// Runs the accept loop.
    ///
    /// Every accepted connection is registered and announced before the
    /// next one is accepted, so identities and join notices follow accept
    /// order. Returns only if accepting fails; connections already open
    /// keep running on their own tasks.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!("relay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => self.admit(conn),
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, shutting down");
                    return Err(e.into());
                }
            }
        }
    }

    fn admit(&self, conn: TcpLineConnection) {
        let id = self.state.ids.next_id();
        let peer = conn.peer_addr();
        tracing::info!(client_id = %id, %peer, "new client connected");

        let (session, queue) = ClientSession::new(id, &self.state.session_config);
        match self.state.broadcaster.admit(session) {
            Ok(guard) => spawn_session(conn, guard, queue),
            // Dropping `conn` closes the socket.
            Err(e) => tracing::warn!(client_id = %id, error = %e, "could not admit client"),
        }
    }
}
