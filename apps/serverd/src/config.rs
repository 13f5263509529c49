//! Daemon configuration.
//!
//! Stored as TOML. The file is taken from the first command-line argument,
//! then from `CHUNKPORT_CONFIG`; without either the defaults are used.
//!
//! ```toml
//! storage_root = "/var/lib/chunkport"
//!
//! [server]
//! listen_addr = "0.0.0.0:8980"
//! layout = "worker_namespaced"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use chunkport_server::ServerConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CHUNKPORT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Directory that upload namespaces are created under.
    pub storage_root: PathBuf,

    pub server: ServerConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("data"),
            server: ServerConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Config file location from the command line or the environment.
    pub fn locate() -> Option<PathBuf> {
        std::env::args_os()
            .nth(1)
            .or_else(|| std::env::var_os(CONFIG_ENV))
            .map(PathBuf::from)
    }

    /// Loads `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_gives_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn loads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serverd.toml");
        std::fs::write(
            &path,
            r#"
            storage_root = "/srv/uploads"

            [server]
            listen_addr = "127.0.0.1:9000"
            max_concurrent_sessions = 32
            "#,
        )
        .unwrap();

        let config = DaemonConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/uploads"));
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.server.max_concurrent_sessions, Some(32));
        assert_eq!(config.server.namespace, "uploads");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DaemonConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
