//! Command-line interface for the `relaychat` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use relaychat_transport::DEFAULT_MAX_LINE_LENGTH;

use crate::{RelayConfig, RelayError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat relay, accepting TCP connections.
    Server(ServerArgs),
    /// Connect to a relay and chat from the console.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// JSON config file. Flags given on the command line override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Socket address to bind to. Use port 0 for an ephemeral port.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Lines that may queue for one client before it is disconnected.
    #[arg(long)]
    pub outbound_capacity: Option<usize>,

    /// Longest line accepted from a client, in bytes.
    #[arg(long)]
    pub max_line_length: Option<usize>,
}

impl ServerArgs {
    /// Builds the effective config: defaults, then the config file, then flags.
    pub fn resolve(&self) -> Result<RelayConfig, RelayError> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_json_file(path)?,
            None => RelayConfig::default(),
        };
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(capacity) = self.outbound_capacity {
            config.outbound_capacity = capacity;
        }
        if let Some(max) = self.max_line_length {
            config.max_line_length = max;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the relay, as `host:port`.
    #[arg(long, default_value = "localhost:3314")]
    pub server: String,

    /// Longest line accepted from the relay, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,
}
