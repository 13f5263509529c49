//! Server side of chunkport uploads.
//!
//! Every incoming call gets its own [`UploadSession`]: a small state
//! machine that lazily opens a [`Sink`](chunkport_sink::Sink) object on the
//! first chunk, appends chunks in arrival order and answers with exactly
//! one terminal status. [`UploadServer`] accepts calls (in-process or over
//! TCP) and runs each session on its own task; the [`SessionRegistry`]
//! only counts them.

mod config;
mod naming;
mod registry;
mod server;
mod session;

pub use config::ServerConfig;
pub use naming::{PathLayout, SessionId, SessionNamer};
pub use registry::{RegistrySnapshot, SessionGuard, SessionRegistry};
pub use server::UploadServer;
pub use session::{SessionEvent, SessionReport, SessionState, UploadSession, run_session};

/// TCP read buffer size per connection (256 KB).
pub const TCP_BUFFER_SIZE: usize = 256 * 1024;

/// Errors produced by the upload server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] chunkport_protocol::ProtocolError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
