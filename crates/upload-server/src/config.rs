use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use chunkport_protocol::{DEFAULT_REQUEST_BUFFER, MAX_MESSAGE_SIZE};

use crate::ServerError;
use crate::naming::PathLayout;

/// Upload server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP address to listen on (port 0 = OS-assigned).
    pub listen_addr: SocketAddr,

    /// Namespace (top-level directory) that session objects are created in.
    pub namespace: String,

    /// How object paths are laid out under the namespace.
    pub layout: PathLayout,

    /// Largest accepted message; chunk payloads must be strictly smaller.
    pub max_message_size: usize,

    /// Upper bound on concurrently running sessions (`None` = unbounded).
    pub max_concurrent_sessions: Option<usize>,

    /// Per-call request channel capacity.
    pub request_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8980)),
            namespace: "uploads".into(),
            layout: PathLayout::Flat,
            max_message_size: MAX_MESSAGE_SIZE,
            max_concurrent_sessions: None,
            request_buffer: DEFAULT_REQUEST_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_message_size == 0 {
            return Err(ServerError::Config("max_message_size must be positive".into()));
        }
        if self.request_buffer == 0 {
            return Err(ServerError::Config("request_buffer must be positive".into()));
        }
        if self.max_concurrent_sessions == Some(0) {
            return Err(ServerError::Config(
                "max_concurrent_sessions must be positive when set".into(),
            ));
        }
        chunkport_sink::validate_object_path(&self.namespace)
            .map_err(|e| ServerError::Config(format!("namespace: {e}")))?;
        Ok(())
    }
}
