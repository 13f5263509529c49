//! One-shot completion signal between an upload's response handler and
//! the caller waiting for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;

use chunkport_protocol::Status;

use crate::ClientError;

/// Creates a connected releaser/gate pair.
pub fn completion_gate() -> (GateReleaser, CompletionGate) {
    let (tx, rx) = oneshot::channel();
    let released = Arc::new(AtomicBool::new(false));
    (
        GateReleaser {
            tx,
            released: Arc::clone(&released),
        },
        CompletionGate { rx, released },
    )
}

/// Releases a [`CompletionGate`]; consumed on use, so a gate is released at
/// most once.
#[derive(Debug)]
pub struct GateReleaser {
    tx: oneshot::Sender<Result<Status, ClientError>>,
    released: Arc<AtomicBool>,
}

impl GateReleaser {
    /// Releases the gate with the upload outcome.
    ///
    /// Returns `false` if the waiting side has already given up.
    pub fn release(self, outcome: Result<Status, ClientError>) -> bool {
        self.released.store(true, Ordering::Release);
        self.tx.send(outcome).is_ok()
    }
}

/// Waiting side of the completion signal.
#[derive(Debug)]
pub struct CompletionGate {
    rx: oneshot::Receiver<Result<Status, ClientError>>,
    released: Arc<AtomicBool>,
}

impl CompletionGate {
    /// Returns `true` once the response handler has released the gate.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for the gate to be released.
    pub async fn wait(self, timeout: Duration) -> Result<Status, ClientError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::Transport(
                "response handler dropped without releasing".into(),
            )),
            Err(_) => Err(ClientError::Timeout(timeout)),
        }
    }
}
