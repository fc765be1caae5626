//! Frame codec for async I/O.
//!
//! This module reads and writes whole frames over an async stream.

#[cfg(feature = "async-tokio")]
mod framed;

#[cfg(feature = "async-tokio")]
pub use framed::FrameCodec;

#[cfg(all(test, feature = "async-tokio"))]
pub(crate) use framed::tests::MockStream;
