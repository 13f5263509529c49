//! Fixed-size chunking of a local byte source.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};

use chunkport_protocol::Chunk;

use crate::ClientError;

/// Reads a byte source in chunks of exactly `chunk_size` bytes (the last
/// chunk may be shorter).
///
/// The sequence is lazy, finite and not restartable: after the source is
/// exhausted or a read fails, [`next_chunk`](Self::next_chunk) keeps
/// returning `None`.
pub struct ChunkSource<R> {
    reader: R,
    chunk_size: usize,
    bytes_read: u64,
    done: bool,
}

impl ChunkSource<tokio::fs::File> {
    /// Opens a local file for chunked reading.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, ClientError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(ClientError::SourceRead)?;
        Self::new(file, chunk_size)
    }
}

impl<R: AsyncRead + Unpin> ChunkSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Result<Self, ClientError> {
        if chunk_size == 0 {
            return Err(ClientError::Config("chunk size must be positive".into()));
        }
        Ok(Self {
            reader,
            chunk_size,
            bytes_read: 0,
            done: false,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    ///
    /// Short reads are accumulated until the chunk is full, so only the
    /// final chunk can be shorter than `chunk_size`.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, ClientError> {
        if self.done {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Err(ClientError::SourceRead(e));
                }
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.bytes_read += filled as u64;
        Ok(Some(Chunk::new(buf)))
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes produced so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(data: &[u8], chunk_size: usize) -> Vec<Chunk> {
        let mut source = ChunkSource::new(data, chunk_size).unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(source.bytes_read(), data.len() as u64);
        chunks
    }

    #[tokio::test]
    async fn chunk_counts_and_sizes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        for chunk_size in [1, 7, 100, 999, 1000, 1001, 4096] {
            let chunks = collect(&data, chunk_size).await;
            let expected = data.len().div_ceil(chunk_size);
            assert_eq!(chunks.len(), expected, "chunk_size {chunk_size}");

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.len() == chunk_size));
            let tail = data.len() % chunk_size;
            let expected_last = if tail == 0 { chunk_size } else { tail };
            assert_eq!(last.len(), expected_last.min(data.len()));

            let joined: Vec<u8> = chunks.iter().flat_map(|c| c.content().to_vec()).collect();
            assert_eq!(joined, data);
        }
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        assert!(collect(&[], 16).await.is_empty());
    }

    #[tokio::test]
    async fn short_reads_are_accumulated() {
        let reader = tokio_test::io::Builder::new()
            .read(b"ab")
            .read(b"cde")
            .read(b"f")
            .build();
        let mut source = ChunkSource::new(reader, 4).unwrap();

        let c1 = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(&c1.content()[..], b"abcd");
        let c2 = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(&c2.content()[..], b"ef");
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_error_surfaces_then_fuses() {
        let reader = tokio_test::io::Builder::new()
            .read(b"abcd")
            .read_error(std::io::Error::other("disk gone"))
            .build();
        let mut source = ChunkSource::new(reader, 4).unwrap();

        assert!(source.next_chunk().await.unwrap().is_some());
        assert!(matches!(
            source.next_chunk().await,
            Err(ClientError::SourceRead(_))
        ));
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_chunk_size_rejected() {
        let data: &[u8] = b"x";
        assert!(matches!(
            ChunkSource::new(data, 0),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn open_missing_file_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ChunkSource::open(&dir.path().join("missing.bin"), 16).await;
        assert!(matches!(result, Err(ClientError::SourceRead(_))));
    }

    #[tokio::test]
    async fn open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"The quick brown fox").unwrap();

        let mut source = ChunkSource::open(&path, 10).await.unwrap();
        let c1 = source.next_chunk().await.unwrap().unwrap();
        let c2 = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(&c1.content()[..], b"The quick ");
        assert_eq!(&c2.content()[..], b"brown fox");
        assert!(source.next_chunk().await.unwrap().is_none());
    }
}
