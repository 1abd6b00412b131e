//! Byte streams handed from providers to the image pipeline.
//!
//! Every provider yields a [`ByteStream`]: a boxed `AsyncRead` that the caller
//! drains and drops. Filesystem providers stream straight from the open file,
//! HTTP providers stream the response body, and cached or object-store bodies
//! are served from memory.

mod stream;

pub use stream::{from_body_stream, from_bytes, read_to_bytes, ByteStream};
