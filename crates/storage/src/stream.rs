//! Byte streams exchanged with storage adapters

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use fs_core::{Error, Result};
use tokio_stream::{Stream, StreamExt};

/// Content returned by `StorageAdapter::read`, delivered in chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk stream
pub fn once(data: Bytes) -> ByteStream {
    Box::pin(tokio_stream::once(Ok(data)))
}

/// Drain a stream into one contiguous buffer
pub async fn collect(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Fail with `InvalidEncoding` unless `data` is valid UTF-8
pub fn ensure_utf8(path: &str, data: &[u8]) -> Result<()> {
    std::str::from_utf8(data)
        .map(|_| ())
        .map_err(|_| Error::InvalidEncoding {
            path: path.to_string(),
        })
}

/// Data handed to `StorageAdapter::write`: a buffer or a streaming source
pub enum WriteSource {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl WriteSource {
    /// Buffer the whole source
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            WriteSource::Bytes(data) => Ok(data),
            WriteSource::Stream(stream) => collect(stream).await,
        }
    }
}

impl fmt::Debug for WriteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteSource::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            WriteSource::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for WriteSource {
    fn from(data: Bytes) -> Self {
        WriteSource::Bytes(data)
    }
}

impl From<Vec<u8>> for WriteSource {
    fn from(data: Vec<u8>) -> Self {
        WriteSource::Bytes(Bytes::from(data))
    }
}

impl From<String> for WriteSource {
    fn from(data: String) -> Self {
        WriteSource::Bytes(Bytes::from(data))
    }
}

impl From<&'static str> for WriteSource {
    fn from(data: &'static str) -> Self {
        WriteSource::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

impl From<ByteStream> for WriteSource {
    fn from(stream: ByteStream) -> Self {
        WriteSource::Stream(stream)
    }
}
