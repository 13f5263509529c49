//! Backing stores for received uploads.
//!
//! An upload session only ever sees the [`Sink`] trait: open a named
//! object, append bytes to it in order, close it. Two implementations ship
//! with the crate:
//!
//! - [`FsSink`]: files under a root directory, fsynced on close.
//! - [`MemorySink`]: in-memory objects with fault injection, for tests and
//!   benchmarks that should not touch disk.

mod fs;
mod memory;
mod path;

pub use fs::{FsHandle, FsSink};
pub use memory::{FaultPlan, MemoryHandle, MemorySink, SinkCall};
pub use path::validate_object_path;

use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by [`Sink`] methods.
pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SinkError>> + Send + 'a>>;

/// Durable write target for one upload at a time per handle.
///
/// Each handle is owned by exactly one session and is the only writer to
/// its object. `open` must create any missing parent namespace.
pub trait Sink: Send + Sync + 'static {
    type Handle: Send + 'static;

    /// Creates (or truncates) the object at `path` and returns a handle.
    fn open<'a>(&'a self, path: &'a str) -> SinkFuture<'a, Self::Handle>;

    /// Appends `bytes` to the object.
    fn write<'a>(&'a self, handle: &'a mut Self::Handle, bytes: &'a [u8]) -> SinkFuture<'a, ()>;

    /// Flushes and releases the handle.
    fn close(&self, handle: Self::Handle) -> SinkFuture<'_, ()>;
}

/// Errors produced by backing stores.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to close {path}: {source}")]
    Close {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object path: {0}")]
    InvalidPath(String),
}
