//! Per-call upload state machine.
//!
//! ```text
//! Uninitialized ──chunk──▶ Open ──write──▶ Receiving ──end──▶ Finalizing ──▶ Committed
//!       │                   │                  │                  │
//!       └──────── open/write/close failure, abort, lost stream ───┴──────▶ Aborted
//! ```
//!
//! A session reaches exactly one terminal state and reports exactly one
//! [`Status`]. Events arriving after that are ignored.

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chunkport_protocol::call::{Inbound, Responder};
use chunkport_protocol::{Chunk, ServerCall, Status};
use chunkport_sink::{Sink, SinkError};

use crate::naming::{SessionId, SessionNamer};

/// Lifecycle state of an [`UploadSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Open,
    Receiving,
    Finalizing,
    Committed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

/// Discrete input of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ChunkReceived(Chunk),
    StreamEnded,
    StreamAborted,
}

impl From<Inbound> for SessionEvent {
    fn from(inbound: Inbound) -> Self {
        match inbound {
            Inbound::Chunk(chunk) => Self::ChunkReceived(chunk),
            Inbound::End => Self::StreamEnded,
            Inbound::Abort => Self::StreamAborted,
        }
    }
}

/// Summary of a finished (or in-flight) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub id: SessionId,
    pub path: String,
    pub state: SessionState,
    pub chunks: u64,
    pub bytes_written: u64,
    /// SHA-256 (hex) of the bytes written so far.
    pub digest: String,
    /// Last sink error, if the session failed because of one.
    pub error: Option<String>,
}

/// One upload's reassembly state.
///
/// Exclusively owns its sink handle; nothing else writes to its object.
pub struct UploadSession<'s, S: Sink> {
    sink: &'s S,
    id: SessionId,
    path: String,
    state: SessionState,
    handle: Option<S::Handle>,
    chunks: u64,
    bytes_written: u64,
    hasher: Sha256,
    error: Option<String>,
}

impl<'s, S: Sink> UploadSession<'s, S> {
    pub fn new(sink: &'s S, id: SessionId, path: String) -> Self {
        Self {
            sink,
            id,
            path,
            state: SessionState::Uninitialized,
            handle: None,
            chunks: 0,
            bytes_written: 0,
            hasher: Sha256::new(),
            error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            id: self.id,
            path: self.path.clone(),
            state: self.state,
            chunks: self.chunks,
            bytes_written: self.bytes_written,
            digest: hex::encode(self.hasher.clone().finalize()),
            error: self.error.clone(),
        }
    }

    /// Applies one event.
    ///
    /// Returns the terminal status when this event finished the session,
    /// `None` otherwise (including for every event after a terminal state).
    pub async fn handle(&mut self, event: SessionEvent) -> Option<Status> {
        if self.state.is_terminal() {
            // Late sends are a no-op from the client's point of view.
            debug!(session = %self.id, state = ?self.state, "ignoring event after terminal state");
            return None;
        }

        match event {
            SessionEvent::ChunkReceived(chunk) => {
                if self.state == SessionState::Uninitialized {
                    if let Err(e) = self.open().await {
                        return Some(self.fail(e).await);
                    }
                }
                self.write(chunk).await
            }
            SessionEvent::StreamEnded => {
                if self.state == SessionState::Uninitialized {
                    if let Err(e) = self.open().await {
                        return Some(self.fail(e).await);
                    }
                }
                Some(self.finalize().await)
            }
            SessionEvent::StreamAborted => {
                warn!(session = %self.id, state = ?self.state, "client aborted upload");
                self.state = SessionState::Aborted;
                self.close_quietly().await;
                Some(Status::FAILURE)
            }
        }
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        let handle = self.sink.open(&self.path).await?;
        self.handle = Some(handle);
        self.state = SessionState::Open;
        debug!(session = %self.id, path = %self.path, "session opened");
        Ok(())
    }

    async fn write(&mut self, chunk: Chunk) -> Option<Status> {
        let Some(handle) = self.handle.as_mut() else {
            warn!(session = %self.id, state = ?self.state, "no open handle for chunk");
            self.state = SessionState::Aborted;
            return Some(Status::FAILURE);
        };
        let content = chunk.into_content();
        if let Err(e) = self.sink.write(handle, &content).await {
            return Some(self.fail(e).await);
        }

        self.chunks += 1;
        self.bytes_written += content.len() as u64;
        self.hasher.update(&content);
        self.state = SessionState::Receiving;
        debug!(session = %self.id, chunk = self.chunks, size = content.len(), "chunk received");
        None
    }

    async fn finalize(&mut self) -> Status {
        self.state = SessionState::Finalizing;
        let Some(handle) = self.handle.take() else {
            self.state = SessionState::Aborted;
            return Status::FAILURE;
        };

        match self.sink.close(handle).await {
            Ok(()) => {
                self.state = SessionState::Committed;
                info!(
                    session = %self.id,
                    path = %self.path,
                    chunks = self.chunks,
                    bytes = self.bytes_written,
                    "upload committed"
                );
                Status::SUCCESS
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "failed to finalize upload");
                self.error = Some(e.to_string());
                self.state = SessionState::Aborted;
                Status::FAILURE
            }
        }
    }

    /// Moves to `Aborted` after a sink failure and releases the handle.
    async fn fail(&mut self, error: SinkError) -> Status {
        warn!(session = %self.id, state = ?self.state, error = %error, "upload aborted");
        self.error = Some(error.to_string());
        self.state = SessionState::Aborted;
        self.close_quietly().await;
        Status::FAILURE
    }

    /// Best-effort close of any open handle.
    async fn close_quietly(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.sink.close(handle).await {
                debug!(session = %self.id, error = %e, "close after abort failed");
            }
        }
    }
}

/// Drives one call to completion.
///
/// The session is created when the first event arrives. The terminal
/// status is sent as soon as it is known; the request stream is then
/// drained until the client ends it, so late chunks never block the
/// transport. A request stream that closes without an end marker counts
/// as an abort.
pub async fn run_session<S: Sink>(sink: &S, namer: &SessionNamer, call: ServerCall) -> SessionReport {
    let (mut requests, responder) = call.split();
    let mut responder = Some(responder);

    let mut event = next_event(&mut requests).await;
    let (id, path) = namer.assign();
    let mut session = UploadSession::new(sink, id, path);

    loop {
        let last = !matches!(event, SessionEvent::ChunkReceived(_));
        if let Some(status) = session.handle(event).await {
            respond(&mut responder, session.id(), status);
        }
        if last {
            break;
        }
        event = next_event(&mut requests).await;
    }

    session.report()
}

async fn next_event(requests: &mut mpsc::Receiver<Inbound>) -> SessionEvent {
    match requests.recv().await {
        Some(inbound) => inbound.into(),
        None => SessionEvent::StreamAborted,
    }
}

fn respond(responder: &mut Option<Responder>, id: SessionId, status: Status) {
    match responder.take() {
        Some(r) => {
            if !r.send(status) {
                debug!(session = %id, code = %status.code, "client no longer waiting for status");
            }
        }
        None => debug!(session = %id, "status already sent"),
    }
}
