use bytes::BytesMut;
use log::trace;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::Frame;

/// Frame-level reader and writer over an async byte stream.
///
/// Reads are exact: the header, extended length, masking key and payload of
/// one frame are taken from the stream and nothing past it, so bytes of the
/// next frame stay on the transport. Writes encode into a reusable buffer and
/// are sent with `write_all`.
pub struct FrameCodec<T> {
    io: T,
    write_buf: BytesMut,
    max_frame_size: usize,
}

impl<T: AsyncRead> FrameCodec<T> {
    /// Wrap `io`, taking the frame size limit and write buffer size from `config`.
    #[must_use]
    pub fn new(io: T, config: &Config) -> Self {
        Self {
            io,
            write_buf: BytesMut::with_capacity(config.write_buffer_size),
            max_frame_size: config.limits.max_frame_size,
        }
    }

    /// Borrow the underlying stream.
    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    /// Give back the underlying stream. Unread frames are still on it.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> FrameCodec<T> {
    /// Read the next complete frame.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let frame = Frame::decode(&mut self.io, self.max_frame_size).await?;
        trace!(
            "read frame: opcode={} fin={} len={}",
            frame.opcode,
            frame.fin,
            frame.payload_len()
        );
        Ok(frame)
    }

    /// Encode and write one frame. Call [`flush`](Self::flush) to push it out.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_buf.clear();
        frame.encode(&mut self.write_buf);
        self.io.write_all(&self.write_buf).await?;
        trace!(
            "wrote frame: opcode={} fin={} len={}",
            frame.opcode,
            frame.fin,
            frame.payload_len()
        );
        Ok(())
    }

    /// Flush frames written so far to the transport.
    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }

    /// Flush and shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
