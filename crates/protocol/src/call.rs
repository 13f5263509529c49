//! In-process model of one client-streaming upload call.
//!
//! ```text
//! ClientCall ──(bounded mpsc: Inbound)──▶ ServerCall
//! ClientCall ◀──(oneshot: Status)──────── ServerCall
//! ```
//!
//! The request side is ordered and bounded (backpressure). The response
//! side is a oneshot, so at most one [`Status`] can ever be delivered.

use tokio::sync::{mpsc, oneshot};

use crate::types::{Chunk, Status};

/// Request-stream event as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Chunk(Chunk),
    /// Client signalled end of input.
    End,
    /// Client signalled an error and abandoned the upload.
    Abort,
}

/// Returned when the other side of a call has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("upload call closed")]
pub struct CallClosed;

/// Creates a connected call pair with a request buffer of `capacity`.
pub fn upload_call(capacity: usize) -> (ClientCall, ServerCall) {
    let (req_tx, req_rx) = mpsc::channel(capacity.max(1));
    let (resp_tx, resp_rx) = oneshot::channel();
    (
        ClientCall {
            requests: RequestSender { tx: req_tx },
            response: resp_rx,
        },
        ServerCall {
            requests: req_rx,
            responder: Responder { tx: resp_tx },
        },
    )
}

/// Client half of an upload call.
#[derive(Debug)]
pub struct ClientCall {
    requests: RequestSender,
    response: oneshot::Receiver<Status>,
}

impl ClientCall {
    /// Splits the call into its send handle and the pending response.
    pub fn split(self) -> (RequestSender, oneshot::Receiver<Status>) {
        (self.requests, self.response)
    }
}

/// Outbound request stream of a call.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: mpsc::Sender<Inbound>,
}

impl RequestSender {
    /// Sends one chunk, waiting for buffer space.
    pub async fn send_chunk(&self, chunk: Chunk) -> Result<(), CallClosed> {
        self.tx.send(Inbound::Chunk(chunk)).await.map_err(|_| CallClosed)
    }

    /// Signals end of input. Consumes the sender.
    pub async fn finish(self) -> Result<(), CallClosed> {
        self.tx.send(Inbound::End).await.map_err(|_| CallClosed)
    }

    /// Signals that the client abandoned the upload. Consumes the sender.
    pub async fn abort(self) -> Result<(), CallClosed> {
        self.tx.send(Inbound::Abort).await.map_err(|_| CallClosed)
    }

    /// Returns `true` once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Server half of an upload call.
#[derive(Debug)]
pub struct ServerCall {
    requests: mpsc::Receiver<Inbound>,
    responder: Responder,
}

impl ServerCall {
    /// Splits the call into the inbound event stream and the responder.
    pub fn split(self) -> (mpsc::Receiver<Inbound>, Responder) {
        (self.requests, self.responder)
    }
}

/// Sends the single terminal [`Status`] of a call.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<Status>,
}

impl Responder {
    /// Delivers the terminal status. Returns `false` if nobody is listening
    /// any more (client timed out or disconnected).
    pub fn send(self, status: Status) -> bool {
        self.tx.send(status).is_ok()
    }
}
