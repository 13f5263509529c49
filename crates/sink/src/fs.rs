//! Filesystem-backed sink.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::{Sink, SinkError, SinkFuture, validate_object_path};

/// Write buffer per open object (256 KB).
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Stores each object as a file under `root`.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

/// Open file owned by one upload session.
#[derive(Debug)]
pub struct FsHandle {
    path: String,
    file: BufWriter<File>,
}

impl FsHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an object on disk.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn open_file(&self, path: &str) -> Result<FsHandle, SinkError> {
        validate_object_path(path)?;

        let full_path = self.resolve(path);
        let open_err = |source| SinkError::Open {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(open_err)?;
        }
        let file = File::create(&full_path).await.map_err(open_err)?;

        debug!(path, "sink object opened");
        Ok(FsHandle {
            path: path.to_string(),
            file: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        })
    }

    async fn close_file(&self, mut handle: FsHandle) -> Result<(), SinkError> {
        let close_err = |source| SinkError::Close {
            path: handle.path.clone(),
            source,
        };
        handle.file.flush().await.map_err(close_err)?;
        handle.file.get_ref().sync_all().await.map_err(close_err)?;
        debug!(path = %handle.path, "sink object closed");
        Ok(())
    }
}

impl Sink for FsSink {
    type Handle = FsHandle;

    fn open<'a>(&'a self, path: &'a str) -> SinkFuture<'a, FsHandle> {
        Box::pin(self.open_file(path))
    }

    fn write<'a>(&'a self, handle: &'a mut FsHandle, bytes: &'a [u8]) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            handle
                .file
                .write_all(bytes)
                .await
                .map_err(|source| SinkError::Write {
                    path: handle.path.clone(),
                    source,
                })
        })
    }

    fn close(&self, handle: FsHandle) -> SinkFuture<'_, ()> {
        Box::pin(self.close_file(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_write_close_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());

        let mut handle = sink.open("uploads/abc").await.unwrap();
        assert_eq!(handle.path(), "uploads/abc");
        sink.write(&mut handle, b"Hello").await.unwrap();
        sink.write(&mut handle, b" World").await.unwrap();
        sink.close(handle).await.unwrap();

        let content = std::fs::read(dir.path().join("uploads/abc")).unwrap();
        assert_eq!(&content, b"Hello World");
    }

    #[tokio::test]
    async fn open_creates_parent_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());

        let handle = sink.open("a/b/c/object").await.unwrap();
        sink.close(handle).await.unwrap();

        assert!(dir.path().join("a/b/c").is_dir());
        let content = std::fs::read(dir.path().join("a/b/c/object")).unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn open_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());

        let result = sink.open("../escape").await;
        assert!(matches!(result, Err(SinkError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"x").unwrap();
        let sink = FsSink::new(dir.path());

        let result = sink.open("blocker/object").await;
        assert!(matches!(result, Err(SinkError::Open { .. })));
    }

    #[tokio::test]
    async fn large_write_survives_buffering() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let data = vec![0xABu8; WRITE_BUFFER_SIZE * 3 + 17];

        let mut handle = sink.open("big").await.unwrap();
        for piece in data.chunks(100 * 1024) {
            sink.write(&mut handle, piece).await.unwrap();
        }
        sink.close(handle).await.unwrap();

        assert_eq!(std::fs::read(sink.resolve("big")).unwrap(), data);
    }
}
