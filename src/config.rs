//! Session configuration.
//!
//! [`Limits`] bound what a peer can make the server buffer; [`Config`] groups
//! them with the settings of the outgoing side.

use crate::error::{Error, Result};

const MIB: usize = 1024 * 1024;

/// Caps on inbound frames and messages.
///
/// A peer that crosses any of them is answered with close code 1009 and the
/// connection is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest payload accepted in one frame, in bytes. Compared with the
    /// length announced in the header, so an oversized payload is never read.
    pub max_frame_size: usize,

    /// Largest reassembled message, in bytes.
    pub max_message_size: usize,

    /// Most frames (initial frame plus continuations) one message may span.
    pub max_fragment_count: usize,
}

impl Default for Limits {
    /// 16 MiB frames, 64 MiB messages, 128 fragments.
    fn default() -> Self {
        Self::new(16 * MIB, 64 * MIB, 128)
    }
}

impl Limits {
    /// Limits with the given frame size, message size and fragment count.
    #[must_use]
    pub const fn new(max_frame_size: usize, max_message_size: usize, max_fragment_count: usize) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_fragment_count,
        }
    }

    /// Tight preset for memory constrained hosts: 64 KiB frames, 256 KiB
    /// messages, 16 fragments.
    #[must_use]
    pub const fn embedded() -> Self {
        Self::new(64 * 1024, 256 * 1024, 16)
    }

    /// # Errors
    ///
    /// `Error::MessageTooLarge` when `size` is over `max_message_size`.
    pub fn check_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Error::TooManyFragments` when `count` is over `max_fragment_count`.
    pub fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            return Err(Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            });
        }
        Ok(())
    }
}

/// Settings for one [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub limits: Limits,

    /// Starting capacity of the buffer frames are encoded into before they
    /// are written. Grows as needed. Default 8 KiB.
    pub write_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            write_buffer_size: 8 * 1024,
        }
    }
}

impl Config {
    /// Default limits and an 8 KiB write buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the inbound limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the starting capacity of the write buffer.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }
}
