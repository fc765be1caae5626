//! UTF-8 validation for text messages.
//!
//! Fragments of a text message are checked as they arrive so a bad byte
//! fails the connection without waiting for the final fragment. A code point
//! split across a fragment boundary is carried over to the next fragment.

use crate::error::{Error, Result};

/// Incremental UTF-8 validator for one fragmented text message.
#[derive(Debug, Clone, Default)]
pub struct Utf8Validator {
    /// Leading bytes of a code point cut off at the end of the last fragment.
    pending: [u8; 3],
    pending_len: usize,
}

impl Utf8Validator {
    /// Create a validator with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the next fragment of a text message.
    ///
    /// When `is_final` is false a truncated code point at the end of `data`
    /// is accepted and remembered; any other bad sequence is an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` on an invalid sequence, or on a truncated
    /// sequence at the end of the final fragment.
    pub fn feed(&mut self, data: &[u8], is_final: bool) -> Result<()> {
        let mut rest = data;

        if self.pending_len > 0 {
            // Complete the carried-over code point first, one byte at a time.
            let mut buf = [0u8; 4];
            buf[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
            let mut len = self.pending_len;
            self.pending_len = 0;

            loop {
                match std::str::from_utf8(&buf[..len]) {
                    Ok(_) => break,
                    Err(e) if e.error_len().is_some() => return Err(Error::InvalidUtf8),
                    Err(_) => match rest.split_first() {
                        Some((byte, tail)) if len < 4 => {
                            buf[len] = *byte;
                            len += 1;
                            rest = tail;
                        }
                        _ => return self.hold(&buf[..len], is_final),
                    },
                }
            }
        }

        match std::str::from_utf8(rest) {
            Ok(_) => Ok(()),
            Err(e) if e.error_len().is_none() => self.hold(&rest[e.valid_up_to()..], is_final),
            Err(_) => Err(Error::InvalidUtf8),
        }
    }

    fn hold(&mut self, tail: &[u8], is_final: bool) -> Result<()> {
        if is_final || tail.len() > self.pending.len() {
            return Err(Error::InvalidUtf8);
        }
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();
        Ok(())
    }

    /// Check if a partial code point is waiting for the next fragment.
    #[must_use]
    pub fn has_incomplete(&self) -> bool {
        self.pending_len > 0
    }
}

/// Validate a complete byte sequence and borrow it as `&str`.
///
/// # Errors
///
/// Returns `Error::InvalidUtf8` if the data is not valid UTF-8.
pub fn validate_utf8(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data).map_err(|_| Error::InvalidUtf8)
}
