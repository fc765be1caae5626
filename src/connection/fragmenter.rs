//! Message fragmentation for outgoing WebSocket messages (RFC 6455).

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};

/// Iterator that produces frames from a message payload.
///
/// Splits the payload into `ceil(len / fragment_size)` frames. The first
/// frame carries the message opcode, the rest are `OpCode::Continuation`, and
/// only the last has FIN set. An empty payload yields one empty final frame.
/// Chunks are zero-copy slices of the original payload.
#[derive(Debug)]
pub struct MessageFragmenter {
    payload: Bytes,
    opcode: OpCode,
    fragment_size: usize,
    is_first: bool,
}

impl MessageFragmenter {
    /// Create a new fragmenter for the given payload.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFragmentSize` if `fragment_size` is zero
    /// - `Error::InvalidMessageOpcode` if `opcode` is not Text or Binary
    pub fn new(payload: impl Into<Bytes>, opcode: OpCode, fragment_size: usize) -> Result<Self> {
        if fragment_size == 0 {
            return Err(Error::InvalidFragmentSize);
        }
        if !matches!(opcode, OpCode::Text | OpCode::Binary) {
            return Err(Error::InvalidMessageOpcode(opcode));
        }
        Ok(Self {
            payload: payload.into(),
            opcode,
            fragment_size,
            is_first: true,
        })
    }

    /// Get remaining bytes to send.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len()
    }
}

impl Iterator for MessageFragmenter {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.payload.is_empty() && !self.is_first {
            return None;
        }

        let chunk_size = self.payload.len().min(self.fragment_size);
        let chunk = self.payload.split_to(chunk_size);
        let is_final = self.payload.is_empty();

        let opcode = if self.is_first {
            self.is_first = false;
            self.opcode
        } else {
            OpCode::Continuation
        };

        Some(Frame::new(is_final, opcode, chunk))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.is_first && self.payload.is_empty() {
            1
        } else {
            self.payload.len().div_ceil(self.fragment_size)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for MessageFragmenter {}
