//! Server configuration, loadable from a JSON file.

use std::net::SocketAddr;
use std::path::Path;

use relaychat_session::SessionConfig;
use relaychat_transport::DEFAULT_MAX_LINE_LENGTH;
use serde::{Deserialize, Serialize};

use crate::server::DEFAULT_PORT;
use crate::RelayError;

/// Settings for one relay server.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "listen": "127.0.0.1:4000", "outbound_capacity": 128 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the listener binds to.
    pub listen: SocketAddr,
    /// Lines that may wait for one slow client before it is evicted.
    pub outbound_capacity: usize,
    /// Longest accepted inbound line, in bytes.
    pub max_line_length: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            outbound_capacity: SessionConfig::default().outbound_capacity,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl RelayConfig {
    /// Reads a config from a JSON file.
    ///
    /// # Errors
    /// Returns [`RelayError::Config`] if the file cannot be read or is not
    /// valid JSON for this shape.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let config_error = |source: crate::error::ConfigSource| RelayError::Config {
            path: path.to_path_buf(),
            source,
        };

        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.into()))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| config_error(e.into()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// The per-session part of this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            outbound_capacity: self.outbound_capacity,
        }
    }
}
