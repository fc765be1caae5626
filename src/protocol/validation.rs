//! Conformance checks for frames received from a client (RFC 6455 Section 5).

use crate::error::{Error, Result};
use crate::message::CloseFrame;
use crate::protocol::OpCode;
use crate::protocol::frame::{Frame, FrameHeader, MAX_CONTROL_FRAME_PAYLOAD};

/// Validator for incoming client frames.
///
/// Checks run in a fixed order and the first failure is reported:
///
/// 1. the frame must be masked
/// 2. control frames must be final and carry at most 125 bytes
/// 3. the opcode must not be reserved
/// 4. RSV1-3 must be clear (no extension is ever negotiated)
/// 5. a Close payload must be empty or hold a valid code and UTF-8 reason
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameValidator;

impl FrameValidator {
    /// Create a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate a decoded client frame.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` - frame was sent without a mask
    /// - `Error::FragmentedControlFrame` - control frame with FIN=0
    /// - `Error::ControlFrameTooLarge` - control payload over 125 bytes
    /// - `Error::ReservedOpcode` - opcode 0x3-0x7 or 0xB-0xF
    /// - `Error::ReservedBitsSet` - any RSV bit set
    /// - `Error::InvalidClosePayload` / `Error::InvalidCloseCode` /
    ///   `Error::InvalidCloseReason` - malformed Close payload
    pub fn validate(&self, frame: &Frame) -> Result<()> {
        self.validate_header(&frame.header())?;
        if frame.opcode == OpCode::Close {
            CloseFrame::parse(frame.payload())?;
        }
        Ok(())
    }

    /// Run the checks that need only the header: every rule but the Close
    /// payload one.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate), minus the Close payload errors.
    pub fn validate_header(&self, header: &FrameHeader) -> Result<()> {
        self.validate_masking(header)?;
        self.validate_control(header)?;
        self.validate_opcode(header)?;
        self.validate_rsv_bits(header)
    }

    fn validate_masking(&self, header: &FrameHeader) -> Result<()> {
        if !header.masked {
            return Err(Error::UnmaskedClientFrame);
        }
        Ok(())
    }

    fn validate_control(&self, header: &FrameHeader) -> Result<()> {
        if !header.opcode.is_control() {
            return Ok(());
        }
        if header.payload_len > MAX_CONTROL_FRAME_PAYLOAD as u64 {
            let len = usize::try_from(header.payload_len).unwrap_or(usize::MAX);
            return Err(Error::ControlFrameTooLarge(len));
        }
        if !header.fin {
            return Err(Error::FragmentedControlFrame);
        }
        Ok(())
    }

    fn validate_opcode(&self, header: &FrameHeader) -> Result<()> {
        match header.opcode {
            OpCode::Reserved(byte) => Err(Error::ReservedOpcode(byte)),
            _ => Ok(()),
        }
    }

    fn validate_rsv_bits(&self, header: &FrameHeader) -> Result<()> {
        if header.rsv1 || header.rsv2 || header.rsv3 {
            return Err(Error::ReservedBitsSet);
        }
        Ok(())
    }
}
