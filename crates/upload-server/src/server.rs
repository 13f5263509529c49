//! Upload server.
//!
//! Each call runs on its own task. Over TCP a connection carries exactly
//! one call: request frames are pumped into an in-process call, and the
//! session's status is written back as soon as it is known.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use chunkport_protocol::call::RequestSender;
use chunkport_protocol::wire::{read_inbound, write_status};
use chunkport_protocol::{ClientCall, Inbound, ServerCall, upload_call};
use chunkport_sink::Sink;

use crate::config::ServerConfig;
use crate::naming::SessionNamer;
use crate::registry::SessionRegistry;
use crate::session::{SessionReport, run_session};
use crate::{ServerError, TCP_BUFFER_SIZE};

/// Accepts upload calls and runs one session per call.
pub struct UploadServer<S: Sink> {
    config: ServerConfig,
    sink: Arc<S>,
    namer: SessionNamer,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl<S: Sink> UploadServer<S> {
    /// Creates a server writing into `sink`.
    pub fn new(config: ServerConfig, sink: Arc<S>) -> Result<Arc<Self>, ServerError> {
        config.validate()?;
        Ok(Arc::new(Self {
            namer: SessionNamer::new(config.namespace.clone(), config.layout),
            registry: SessionRegistry::new(config.max_concurrent_sessions),
            config,
            sink,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs one call to completion on the current task.
    pub async fn serve_call(&self, call: ServerCall) -> SessionReport {
        let guard = self.registry.admit().await;
        let report = run_session(self.sink.as_ref(), &self.namer, call).await;
        guard.finish(report.state);
        report
    }

    /// Opens an in-process call served on a new task.
    pub fn open_call(self: &Arc<Self>) -> ClientCall {
        let (client, server_call) = upload_call(self.config.request_buffer);
        let server = Arc::clone(self);
        self.tasks.spawn(async move {
            server.serve_call(server_call).await;
        });
        client
    }

    /// Binds the configured TCP address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "upload server listening");
        Ok(listener)
    }

    /// Binds and serves until [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until [`shutdown`](Self::shutdown),
    /// then waits for every call already in progress to finish.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(active = self.registry.active(), "upload server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            self.tasks.spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    error!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("accept error: {e}");
                        }
                    }
                }
            }
        }

        drop(listener);
        self.tasks.close();
        self.tasks.wait().await;
        info!(snapshot = ?self.registry.snapshot(), "upload server stopped");
        Ok(())
    }

    /// Stops accepting new calls. Calls already running finish normally.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), ServerError> {
        debug!(%peer_addr, "upload connection accepted");
        stream.set_nodelay(true)?;

        let (reader, mut writer) = stream.into_split();
        let reader = BufReader::with_capacity(TCP_BUFFER_SIZE, reader);

        let (client, server_call) = upload_call(self.config.request_buffer);
        let (requests, response) = client.split();

        let pump = tokio::spawn(pump_requests(
            reader,
            requests,
            self.config.max_message_size,
        ));

        let reply = async {
            match response.await {
                Ok(status) => write_status(&mut writer, status).await,
                Err(_) => Ok(()),
            }
        };
        let (report, reply_result) = tokio::join!(self.serve_call(server_call), reply);

        if let Err(e) = pump.await {
            warn!(%peer_addr, "request pump panicked: {e}");
        }
        debug!(%peer_addr, session = %report.id, state = ?report.state, "upload connection finished");
        reply_result?;
        Ok(())
    }
}

/// Forwards request frames from the connection into the call.
///
/// Transport failures abort the call; a clean EOF without an end marker
/// just drops the sender, which the session also treats as an abort.
async fn pump_requests(
    mut reader: BufReader<OwnedReadHalf>,
    requests: RequestSender,
    max_message_size: usize,
) {
    loop {
        match read_inbound(&mut reader, max_message_size).await {
            Ok(Some(Inbound::Chunk(chunk))) => {
                if requests.send_chunk(chunk).await.is_err() {
                    return;
                }
            }
            Ok(Some(Inbound::End)) => {
                let _ = requests.finish().await;
                return;
            }
            Ok(Some(Inbound::Abort)) => {
                let _ = requests.abort().await;
                return;
            }
            Ok(None) => {
                debug!("connection closed without end marker");
                return;
            }
            Err(e) => {
                warn!("failed to read request frame: {e}");
                let _ = requests.abort().await;
                return;
            }
        }
    }
}
