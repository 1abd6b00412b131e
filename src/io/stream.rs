use std::io::{self, Cursor};
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;

/// A readable byte source owned by the caller.
///
/// Dropping the stream releases the underlying file handle or connection.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Wrap an in-memory buffer as a stream.
pub fn from_bytes(data: Bytes) -> ByteStream {
    Box::pin(Cursor::new(data))
}

/// Adapt a chunked body (e.g. an HTTP response) into a stream.
pub fn from_body_stream<S, E>(body: S) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    Box::pin(StreamReader::new(body.map_err(io::Error::other)))
}

/// Drain a stream into a single buffer.
pub async fn read_to_bytes(mut stream: ByteStream) -> io::Result<Bytes> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}
