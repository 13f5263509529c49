use bytes::Bytes;

/// One bounded-size fragment of an upload.
///
/// Carries no sequence number or session id: the transport delivers chunks
/// in order within a call, so the N-th chunk sent is the N-th received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    content: Bytes,
}

impl Chunk {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Result code carried by a terminal [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Default value; never sent on the wire.
    Pending = 0,
    Success = 1,
    Failure = 2,
}

impl StatusCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = crate::ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Success),
            2 => Ok(Self::Failure),
            other => Err(crate::ProtocolError::InvalidStatus(other)),
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// Terminal signal sent exactly once per upload call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
}

impl Status {
    pub const SUCCESS: Status = Status {
        code: StatusCode::Success,
    };
    pub const FAILURE: Status = Status {
        code: StatusCode::Failure,
    };

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_values() {
        assert_eq!(StatusCode::Pending.as_u8(), 0);
        assert_eq!(StatusCode::Success.as_u8(), 1);
        assert_eq!(StatusCode::Failure.as_u8(), 2);
    }

    #[test]
    fn status_code_from_u8() {
        assert_eq!(StatusCode::try_from(1).unwrap(), StatusCode::Success);
        assert_eq!(StatusCode::try_from(2).unwrap(), StatusCode::Failure);
        assert!(StatusCode::try_from(7).is_err());
    }

    #[test]
    fn chunk_exposes_payload() {
        let chunk = Chunk::new(b"abc".to_vec());
        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());
        assert_eq!(&chunk.content()[..], b"abc");
        assert_eq!(&chunk.into_content()[..], b"abc");
    }

    #[test]
    fn status_success_flag() {
        assert!(Status::SUCCESS.is_success());
        assert!(!Status::FAILURE.is_success());
    }
}
