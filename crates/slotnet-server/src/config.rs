use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Server settings.
///
/// Every field has a default, so a config file only needs the fields it
/// changes. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Display name, used in logs.
    pub name: String,
    /// TCP and UDP port. `0` picks an ephemeral TCP port and binds UDP to the same number.
    pub port: u16,
    /// Number of client slots.
    pub max_clients: usize,
    /// Socket buffer and receive scratch size per stream connection, in bytes.
    pub buffer_size: usize,
    /// Tick context plus work lanes.
    pub max_concurrency: usize,
    /// Interval between scheduler ticks, in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "Default Server".to_string(),
            port: 8888,
            max_clients: 30,
            buffer_size: 4096,
            max_concurrency: 2,
            tick_interval_ms: 16,
        }
    }
}

impl ServerConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(ServerError::Config("max_clients must be at least 1".into()));
        }
        if self.buffer_size < 4 {
            return Err(ServerError::Config(format!(
                "buffer_size must be at least 4 bytes (got {})",
                self.buffer_size
            )));
        }
        if self.max_concurrency < 2 {
            return Err(ServerError::Config(format!(
                "max_concurrency must be at least 2 (got {})",
                self.max_concurrency
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ServerError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Wildcard address both transports bind to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
