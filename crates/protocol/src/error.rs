//! Error types for the protocol crate.

/// Errors produced while framing or validating upload messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message of {len} bytes exceeds transport limit ({max} bytes)")]
    MessageTooLarge { len: usize, max: usize },

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("unknown frame tag: {0:#04x}")]
    UnknownFrame(u8),

    #[error("invalid status code: {0}")]
    InvalidStatus(u8),
}
