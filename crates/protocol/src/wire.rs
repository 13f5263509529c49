//! Byte-stream framing for upload calls.
//!
//! # Wire format
//!
//! ```text
//! CLIENT -> SERVER (one call per connection):
//!   CHUNK:  [1 byte: 0x01][4 bytes BE: len][len bytes: payload]
//!   END:    [1 byte: 0x02]
//!   ABORT:  [1 byte: 0x03]
//!
//! SERVER -> CLIENT (exactly once):
//!   STATUS: [1 byte: 0x10][1 byte: code (1=success, 2=failure)]
//! ```
//!
//! Payloads at or above the configured maximum message size are refused on
//! both sides; they are never truncated.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::call::Inbound;
use crate::error::ProtocolError;
use crate::types::{Chunk, Status, StatusCode};

pub const TAG_CHUNK: u8 = 0x01;
pub const TAG_END: u8 = 0x02;
pub const TAG_ABORT: u8 = 0x03;
pub const TAG_STATUS: u8 = 0x10;

/// Writes one request event.
pub async fn write_inbound<W: AsyncWrite + Unpin>(
    writer: &mut W,
    event: &Inbound,
    max_message_size: usize,
) -> Result<(), ProtocolError> {
    match event {
        Inbound::Chunk(chunk) => {
            let len = chunk.len();
            if len >= max_message_size || len > u32::MAX as usize {
                return Err(ProtocolError::MessageTooLarge {
                    len,
                    max: max_message_size,
                });
            }
            writer.write_u8(TAG_CHUNK).await?;
            writer.write_u32(len as u32).await?;
            writer.write_all(chunk.content()).await?;
        }
        Inbound::End => writer.write_u8(TAG_END).await?,
        Inbound::Abort => writer.write_u8(TAG_ABORT).await?,
    }
    Ok(())
}

/// Reads one request event.
///
/// Returns `None` if the stream ends cleanly on a frame boundary.
pub async fn read_inbound<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_message_size: usize,
) -> Result<Option<Inbound>, ProtocolError> {
    let tag = match reader.read_u8().await {
        Ok(tag) => tag,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match tag {
        TAG_CHUNK => {
            let len = reader.read_u32().await? as usize;
            if len >= max_message_size {
                return Err(ProtocolError::MessageTooLarge {
                    len,
                    max: max_message_size,
                });
            }
            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf).await?;
            Ok(Some(Inbound::Chunk(Chunk::new(Bytes::from(buf)))))
        }
        TAG_END => Ok(Some(Inbound::End)),
        TAG_ABORT => Ok(Some(Inbound::Abort)),
        other => Err(ProtocolError::UnknownFrame(other)),
    }
}

/// Writes the terminal status and flushes.
pub async fn write_status<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status: Status,
) -> Result<(), ProtocolError> {
    if status.code == StatusCode::Pending {
        return Err(ProtocolError::InvalidStatus(StatusCode::Pending.as_u8()));
    }
    writer.write_u8(TAG_STATUS).await?;
    writer.write_u8(status.code.as_u8()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the terminal status.
pub async fn read_status<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Status, ProtocolError> {
    let tag = reader.read_u8().await?;
    if tag != TAG_STATUS {
        return Err(ProtocolError::UnknownFrame(tag));
    }
    let code = StatusCode::try_from(reader.read_u8().await?)?;
    if code == StatusCode::Pending {
        return Err(ProtocolError::InvalidStatus(code.as_u8()));
    }
    Ok(Status { code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_MESSAGE_SIZE;

    #[tokio::test]
    async fn request_stream_in_order() {
        let events = vec![
            Inbound::Chunk(Chunk::new(b"first".to_vec())),
            Inbound::Chunk(Chunk::new(b"second".to_vec())),
            Inbound::End,
        ];

        let mut buf = Vec::new();
        for e in &events {
            write_inbound(&mut buf, e, MAX_MESSAGE_SIZE).await.unwrap();
        }

        let mut cursor = &buf[..];
        let mut parsed = Vec::new();
        while let Some(e) = read_inbound(&mut cursor, MAX_MESSAGE_SIZE).await.unwrap() {
            parsed.push(e);
        }
        assert_eq!(parsed, events);
    }

    #[tokio::test]
    async fn abort_frame() {
        let mut buf = Vec::new();
        write_inbound(&mut buf, &Inbound::Abort, MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(buf, vec![TAG_ABORT]);

        let mut cursor = &buf[..];
        let parsed = read_inbound(&mut cursor, MAX_MESSAGE_SIZE).await.unwrap();
        assert_eq!(parsed, Some(Inbound::Abort));
    }

    #[tokio::test]
    async fn empty_stream_is_clean_eof() {
        let mut cursor: &[u8] = &[];
        assert!(read_inbound(&mut cursor, MAX_MESSAGE_SIZE)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn oversized_chunk_refused_on_write() {
        let chunk = Chunk::new(vec![0u8; 64]);
        let mut buf = Vec::new();
        let result = write_inbound(&mut buf, &Inbound::Chunk(chunk), 64).await;
        assert!(matches!(
            result,
            Err(ProtocolError::MessageTooLarge { len: 64, max: 64 })
        ));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn oversized_chunk_rejected_on_read() {
        let mut buf = Vec::new();
        write_inbound(&mut buf, &Inbound::Chunk(Chunk::new(vec![1u8; 32])), 1024)
            .await
            .unwrap();

        let mut cursor = &buf[..];
        let result = read_inbound(&mut cursor, 16).await;
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[tokio::test]
    async fn truncated_chunk_is_error() {
        let mut buf = vec![TAG_CHUNK];
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"short");

        let mut cursor = &buf[..];
        let result = read_inbound(&mut cursor, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }

    #[tokio::test]
    async fn unknown_tag() {
        let mut cursor: &[u8] = &[0x7f];
        let result = read_inbound(&mut cursor, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(ProtocolError::UnknownFrame(0x7f))));
    }

    #[tokio::test]
    async fn status_frames() {
        for status in [Status::SUCCESS, Status::FAILURE] {
            let mut buf = Vec::new();
            write_status(&mut buf, status).await.unwrap();
            let mut cursor = &buf[..];
            assert_eq!(read_status(&mut cursor).await.unwrap(), status);
        }
    }

    #[tokio::test]
    async fn pending_status_never_on_wire() {
        let mut buf = Vec::new();
        let pending = Status {
            code: StatusCode::Pending,
        };
        assert!(write_status(&mut buf, pending).await.is_err());

        let mut cursor: &[u8] = &[TAG_STATUS, 0];
        assert!(matches!(
            read_status(&mut cursor).await,
            Err(ProtocolError::InvalidStatus(0))
        ));
    }
}
