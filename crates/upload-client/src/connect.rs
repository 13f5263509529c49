//! TCP transport for upload calls (client side).
//!
//! Bridges an in-process [`ClientCall`] onto one TCP connection: a writer
//! task frames the request events, a reader task waits for the single
//! status frame.

use std::net::SocketAddr;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use chunkport_protocol::wire::{read_status, write_inbound};
use chunkport_protocol::{ClientCall, Inbound, upload_call};

use crate::config::ClientConfig;
use crate::{ClientError, TCP_BUFFER_SIZE};

/// Connects to an upload server and opens one call on the connection.
pub async fn connect(addr: SocketAddr, config: &ClientConfig) -> Result<ClientCall, ClientError> {
    let stream = match tokio::time::timeout(config.connect_timeout(), TcpStream::connect(addr)).await
    {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ClientError::Transport(format!(
                "connect to {addr} timed out"
            )));
        }
    };
    stream.set_nodelay(true)?;
    debug!(%addr, "upload connection established");

    let (mut reader, writer) = stream.into_split();
    let (client, server_side) = upload_call(config.request_buffer);
    let (mut requests, responder) = server_side.split();
    let max_message_size = config.max_message_size;

    tokio::spawn(async move {
        let mut writer = BufWriter::with_capacity(TCP_BUFFER_SIZE, writer);
        while let Some(event) = requests.recv().await {
            let last = !matches!(event, Inbound::Chunk(_));
            if let Err(e) = write_inbound(&mut writer, &event, max_message_size).await {
                warn!(%addr, "failed to send request frame: {e}");
                break;
            }
            if last {
                break;
            }
        }
        if let Err(e) = writer.flush().await {
            debug!(%addr, "flush failed: {e}");
        }
        let _ = writer.shutdown().await;
    });

    tokio::spawn(async move {
        match read_status(&mut reader).await {
            Ok(status) => {
                debug!(%addr, code = %status.code, "status frame received");
                responder.send(status);
            }
            Err(e) => {
                // Dropping the responder surfaces as a transport error.
                warn!(%addr, "no status from server: {e}");
            }
        }
    });

    Ok(client)
}
