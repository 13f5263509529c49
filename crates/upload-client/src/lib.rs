//! Client side of chunkport uploads.
//!
//! [`UploadController`] reads a local source through a [`ChunkSource`],
//! streams the chunks into an upload call and then blocks on a
//! [`CompletionGate`] until the server's terminal status arrives or the
//! configured timeout expires.

mod config;
mod connect;
mod controller;
mod gate;
mod source;

pub use config::ClientConfig;
pub use connect::connect;
pub use controller::{UploadController, UploadReceipt};
pub use gate::{CompletionGate, GateReleaser, completion_gate};
pub use source::ChunkSource;

use std::time::Duration;

/// TCP write buffer size (256 KB).
pub const TCP_BUFFER_SIZE: usize = 256 * 1024;

/// Errors produced by the upload client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read upload source: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("upload did not finish within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
