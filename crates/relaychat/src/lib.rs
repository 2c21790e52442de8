//! # relaychat
//!
//! A minimal multi-client line chat relay.
//!
//! The server accepts TCP connections, names each client `User<n>`, and
//! rebroadcasts every line a client sends to everyone else connected. The
//! console client opens one connection, prints what arrives, and forwards
//! what is typed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relaychat::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("127.0.0.1:3314".parse().unwrap())
//!     .outbound_capacity(64)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod cli;
pub mod client;
mod config;
mod error;
mod handler;
mod server;

pub use config::RelayConfig;
pub use error::{ConfigSource, RelayError};
pub use server::{DEFAULT_PORT, RelayServer, RelayServerBuilder};

/// Convenience re-exports for embedding the relay.
pub mod prelude {
    pub use crate::{RelayConfig, RelayError, RelayServer, RelayServerBuilder};
    pub use relaychat_protocol::{ClientId, Recipient, ServerLine};
    pub use relaychat_session::{Broadcaster, Registry, SessionConfig};
}
