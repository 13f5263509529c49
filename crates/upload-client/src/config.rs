use std::time::Duration;

use serde::{Deserialize, Serialize};

use chunkport_protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_REQUEST_BUFFER, MAX_MESSAGE_SIZE};

use crate::ClientError;

/// Upload client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Payload bytes per chunk; must be below `max_message_size`.
    pub chunk_size: usize,

    /// Transport message size limit.
    pub max_message_size: usize,

    /// How long to wait for the terminal status, in seconds.
    pub timeout_secs: u64,

    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,

    /// Per-call request channel capacity.
    pub request_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            timeout_secs: 5 * 60,
            connect_timeout_secs: 30,
            request_buffer: DEFAULT_REQUEST_BUFFER,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Checks the chunk size against the transport limit.
    ///
    /// A chunk size at or above the limit is a configuration error, not a
    /// transient fault.
    pub fn validate(&self) -> Result<(), ClientError> {
        chunkport_protocol::check_chunk_size(self.chunk_size, self.max_message_size)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        if self.request_buffer == 0 {
            return Err(ClientError::Config("request_buffer must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 100 * 1024);
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn chunk_size_at_transport_limit_is_config_error() {
        let config = ClientConfig {
            chunk_size: 4 * 1024 * 1024,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        let config = ClientConfig {
            chunk_size: 4000 * 1024,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml() {
        let config: ClientConfig = toml::from_str("chunk_size = 65536\ntimeout_secs = 10").unwrap();
        assert_eq!(config.chunk_size, 65536);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.max_message_size, MAX_MESSAGE_SIZE);
    }
}
