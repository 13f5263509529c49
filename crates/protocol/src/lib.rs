//! Wire-level building blocks for chunkport uploads.
//!
//! One upload is one client-streaming call: the client sends a sequence of
//! [`Chunk`]s followed by an end-of-input marker, the server answers with a
//! single terminal [`Status`]. The call itself is modelled in-process by
//! [`call::upload_call`]; [`wire`] frames the same events for a byte stream.

pub mod call;
pub mod error;
pub mod types;
pub mod wire;

pub use call::{ClientCall, Inbound, ServerCall, upload_call};
pub use error::ProtocolError;
pub use types::{Chunk, Status, StatusCode};

/// Maximum transport message size (4 MiB).
///
/// A chunk payload must be strictly smaller than this.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Default chunk size: 100 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

/// Default capacity of the per-call request channel.
pub const DEFAULT_REQUEST_BUFFER: usize = 16;

/// Checks that `chunk_size` can be carried by a transport whose messages
/// are limited to `max_message_size` bytes.
pub fn check_chunk_size(chunk_size: usize, max_message_size: usize) -> Result<(), ProtocolError> {
    if chunk_size == 0 {
        return Err(ProtocolError::InvalidChunkSize);
    }
    if chunk_size >= max_message_size {
        return Err(ProtocolError::MessageTooLarge {
            len: chunk_size,
            max: max_message_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_fits() {
        assert!(check_chunk_size(DEFAULT_CHUNK_SIZE, MAX_MESSAGE_SIZE).is_ok());
        assert!(check_chunk_size(MAX_MESSAGE_SIZE - 1, MAX_MESSAGE_SIZE).is_ok());
    }

    #[test]
    fn chunk_size_at_limit_rejected() {
        let err = check_chunk_size(MAX_MESSAGE_SIZE, MAX_MESSAGE_SIZE).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MessageTooLarge { len, max } if len == max
        ));
        assert!(check_chunk_size(MAX_MESSAGE_SIZE + 5, MAX_MESSAGE_SIZE).is_err());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(matches!(
            check_chunk_size(0, MAX_MESSAGE_SIZE),
            Err(ProtocolError::InvalidChunkSize)
        ));
    }
}
