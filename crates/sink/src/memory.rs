//! In-memory sink with fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::{Sink, SinkError, SinkFuture};

/// Failures to inject into a [`MemorySink`].
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Every `open` fails.
    pub fail_open: bool,
    /// The write with this zero-based index (per handle) fails.
    pub fail_write_at: Option<usize>,
    /// Every `close` fails.
    pub fail_close: bool,
    /// Delay applied before each write completes.
    pub write_delay: Option<Duration>,
}

/// A call observed by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Open(String),
    Write(String, usize),
    Close(String),
}

/// Objects kept in memory; an object becomes visible when its handle is
/// closed successfully.
#[derive(Debug, Default)]
pub struct MemorySink {
    faults: FaultPlan,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, Vec<u8>>,
    open: HashSet<String>,
    calls: Vec<SinkCall>,
}

/// Buffer owned by one session until close.
#[derive(Debug)]
pub struct MemoryHandle {
    path: String,
    buf: Vec<u8>,
    writes: usize,
}

impl MemoryHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            state: Mutex::default(),
        }
    }

    /// Returns the committed contents of an object.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        let s = self.state.lock().unwrap();
        s.objects.get(path).cloned()
    }

    /// Returns all committed objects.
    pub fn objects(&self) -> HashMap<String, Vec<u8>> {
        let s = self.state.lock().unwrap();
        s.objects.clone()
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<SinkCall> {
        let s = self.state.lock().unwrap();
        s.calls.clone()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        let s = self.state.lock().unwrap();
        s.open.len()
    }

    fn record(&self, call: SinkCall) {
        let mut s = self.state.lock().unwrap();
        s.calls.push(call);
    }
}

fn injected(what: &str) -> std::io::Error {
    std::io::Error::other(format!("injected {what} failure"))
}

impl Sink for MemorySink {
    type Handle = MemoryHandle;

    fn open<'a>(&'a self, path: &'a str) -> SinkFuture<'a, MemoryHandle> {
        Box::pin(async move {
            self.record(SinkCall::Open(path.to_string()));
            if self.faults.fail_open {
                return Err(SinkError::Open {
                    path: path.to_string(),
                    source: injected("open"),
                });
            }

            let mut s = self.state.lock().unwrap();
            // Two live handles on one object would interleave their bytes.
            if !s.open.insert(path.to_string()) {
                return Err(SinkError::Open {
                    path: path.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "object already open",
                    ),
                });
            }
            Ok(MemoryHandle {
                path: path.to_string(),
                buf: Vec::new(),
                writes: 0,
            })
        })
    }

    fn write<'a>(&'a self, handle: &'a mut MemoryHandle, bytes: &'a [u8]) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            self.record(SinkCall::Write(handle.path.clone(), bytes.len()));
            if let Some(delay) = self.faults.write_delay {
                tokio::time::sleep(delay).await;
            }

            let index = handle.writes;
            handle.writes += 1;
            if self.faults.fail_write_at == Some(index) {
                return Err(SinkError::Write {
                    path: handle.path.clone(),
                    source: injected("write"),
                });
            }
            handle.buf.extend_from_slice(bytes);
            Ok(())
        })
    }

    fn close(&self, handle: MemoryHandle) -> SinkFuture<'_, ()> {
        Box::pin(async move {
            self.record(SinkCall::Close(handle.path.clone()));
            let mut s = self.state.lock().unwrap();
            s.open.remove(&handle.path);
            if self.faults.fail_close {
                return Err(SinkError::Close {
                    path: handle.path,
                    source: injected("close"),
                });
            }
            s.objects.insert(handle.path, handle.buf);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn object_visible_after_close() {
        let sink = MemorySink::new();
        let mut h = sink.open("x").await.unwrap();
        sink.write(&mut h, b"ab").await.unwrap();
        assert!(sink.object("x").is_none());

        sink.close(h).await.unwrap();
        assert_eq!(sink.object("x").unwrap(), b"ab");
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Open("x".into()),
                SinkCall::Write("x".into(), 2),
                SinkCall::Close("x".into()),
            ]
        );
    }

    #[tokio::test]
    async fn second_open_of_live_object_fails() {
        let sink = MemorySink::new();
        let h = sink.open("same").await.unwrap();
        assert!(matches!(
            sink.open("same").await,
            Err(SinkError::Open { .. })
        ));
        assert_eq!(sink.open_handles(), 1);

        sink.close(h).await.unwrap();
        assert_eq!(sink.open_handles(), 0);
        assert!(sink.open("same").await.is_ok());
    }

    #[tokio::test]
    async fn injected_faults() {
        let sink = MemorySink::with_faults(FaultPlan {
            fail_open: true,
            ..FaultPlan::default()
        });
        assert!(matches!(sink.open("a").await, Err(SinkError::Open { .. })));

        let sink = MemorySink::with_faults(FaultPlan {
            fail_write_at: Some(1),
            ..FaultPlan::default()
        });
        let mut h = sink.open("a").await.unwrap();
        sink.write(&mut h, b"1").await.unwrap();
        assert!(matches!(
            sink.write(&mut h, b"2").await,
            Err(SinkError::Write { .. })
        ));

        let sink = MemorySink::with_faults(FaultPlan {
            fail_close: true,
            ..FaultPlan::default()
        });
        let h = sink.open("a").await.unwrap();
        assert!(matches!(sink.close(h).await, Err(SinkError::Close { .. })));
        assert!(sink.object("a").is_none());
        assert_eq!(sink.open_handles(), 0);
    }
}
