//! Benchmark configuration, loaded like the server's: first argument,
//! then `CHUNKPORT_BENCH_CONFIG`, then defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chunkport_client::ClientConfig;

pub const CONFIG_ENV: &str = "CHUNKPORT_BENCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub server_addr: SocketAddr,

    /// File uploaded by every run.
    pub file: PathBuf,

    /// Number of uploads to launch.
    pub uploads: usize,

    /// Delay between launching consecutive uploads.
    pub stagger_ms: u64,

    pub client: ClientConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8980)),
            file: PathBuf::from("testfile.bin"),
            uploads: 200,
            stagger_ms: 100,
            client: ClientConfig::default(),
        }
    }
}

impl BenchConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn locate() -> Option<PathBuf> {
        std::env::args_os()
            .nth(1)
            .or_else(|| std::env::var_os(CONFIG_ENV))
            .map(PathBuf::from)
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = BenchConfig::default();
        assert_eq!(config.uploads, 200);
        assert_eq!(config.stagger(), Duration::from_millis(100));
        assert_eq!(config.client.chunk_size, 100 * 1024);
    }

    #[test]
    fn nested_client_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            r#"
            file = "big.mp4"
            uploads = 10

            [client]
            chunk_size = 1048576
            timeout_secs = 60
            "#,
        )
        .unwrap();

        let config = BenchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.file, PathBuf::from("big.mp4"));
        assert_eq!(config.uploads, 10);
        assert_eq!(config.stagger_ms, 100);
        assert_eq!(config.client.chunk_size, 1024 * 1024);
        assert_eq!(config.client.timeout_secs, 60);
    }
}
