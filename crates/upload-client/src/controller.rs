//! Client-side upload driver.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use chunkport_protocol::{ClientCall, Status};

use crate::config::ClientConfig;
use crate::gate::completion_gate;
use crate::source::ChunkSource;
use crate::ClientError;

/// What a finished upload call sent and got back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub status: Status,
    pub chunks_sent: u64,
    pub bytes_sent: u64,
    /// SHA-256 (hex) of the bytes sent.
    pub digest: String,
    /// The server finished before the whole source was sent.
    pub stopped_early: bool,
}

/// Streams local sources into upload calls.
///
/// Holds only configuration, so one controller can drive any number of
/// concurrent uploads without them sharing state.
#[derive(Debug, Clone)]
pub struct UploadController {
    config: ClientConfig,
}

impl UploadController {
    /// Creates a controller; rejects chunk sizes the transport cannot carry.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Uploads a local file over `call`.
    pub async fn upload_file(
        &self,
        call: ClientCall,
        path: &Path,
    ) -> Result<UploadReceipt, ClientError> {
        match tokio::fs::File::open(path).await {
            Ok(file) => self.upload(call, file).await,
            Err(e) => {
                warn!(path = %path.display(), "cannot open upload source: {e}");
                let (requests, _response) = call.split();
                let _ = requests.abort().await;
                Err(ClientError::SourceRead(e))
            }
        }
    }

    /// Streams `reader` over `call` and waits for the terminal status.
    ///
    /// Stops sending silently once the server has answered. A source read
    /// failure aborts the call and is returned to the caller. If no status
    /// arrives within the configured timeout, [`ClientError::Timeout`] is
    /// returned; the call itself is left running.
    pub async fn upload<R: AsyncRead + Unpin>(
        &self,
        call: ClientCall,
        reader: R,
    ) -> Result<UploadReceipt, ClientError> {
        let chunk_size = self.config.chunk_size;
        let mut source = ChunkSource::new(reader, chunk_size)?;

        let (requests, response) = call.split();
        let (releaser, gate) = completion_gate();
        tokio::spawn(async move {
            let outcome = match response.await {
                Ok(status) => {
                    info!(code = %status.code, "upload status received");
                    Ok(status)
                }
                Err(_) => {
                    warn!("upload call closed without a status");
                    Err(ClientError::Transport("call closed without a status".into()))
                }
            };
            if !releaser.release(outcome) {
                debug!("status arrived after the caller stopped waiting");
            }
        });

        info!(chunk_size, "start upload");
        let mut hasher = Sha256::new();
        let mut chunks_sent = 0u64;
        let mut bytes_sent = 0u64;
        let mut stopped_early = false;

        loop {
            let chunk = match source.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    warn!("upload source failed, aborting call: {e}");
                    let _ = requests.abort().await;
                    return Err(e);
                }
            };
            if gate.is_released() {
                // Server finished or failed first; the rest is discarded.
                stopped_early = true;
                break;
            }

            let content = chunk.content().clone();
            if requests.send_chunk(chunk).await.is_err() {
                stopped_early = true;
                break;
            }
            hasher.update(&content);
            chunks_sent += 1;
            bytes_sent += content.len() as u64;
        }

        if stopped_early {
            debug!(chunks_sent, "server finished before the source was exhausted");
            drop(requests);
        } else if requests.finish().await.is_err() {
            debug!("call closed before end of input could be sent");
        }

        let timeout = self.config.timeout();
        let status = match gate.wait(timeout).await {
            Ok(status) => status,
            Err(e @ ClientError::Timeout(_)) => {
                warn!(?timeout, "operation did not finish in time");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(chunk_size, chunks_sent, bytes_sent, code = %status.code, "finish upload");
        Ok(UploadReceipt {
            status,
            chunks_sent,
            bytes_sent,
            digest: hex::encode(hasher.finalize()),
            stopped_early,
        })
    }
}
