//! WebSocket frame encoding and decoding (RFC 6455 Section 5.2).
//!
//! Encoding is deterministic and always picks the shortest length form.
//! Decoding reads exactly one frame from a byte stream and never returns a
//! partial frame; conformance checks are left to
//! [`FrameValidator`](crate::protocol::FrameValidator), except that a frame
//! over the size limit has its header checked before it is refused.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, MAX_CLOSE_REASON};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::validation::FrameValidator;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Length indicator announcing a 16-bit extended length.
const LEN_16: u8 = 126;
/// Length indicator announcing a 64-bit extended length.
const LEN_64: u8 = 127;

const FIN_BIT: u8 = 0x80;
const RSV1_BIT: u8 = 0x40;
const RSV2_BIT: u8 = 0x20;
const RSV3_BIT: u8 = 0x10;
const MASK_BIT: u8 = 0x80;

/// The fixed part of a frame: everything known before the payload is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: OpCode,
    /// Whether a masking key follows the length.
    pub masked: bool,
    /// Announced payload length.
    pub payload_len: u64,
}

/// A WebSocket frame as defined in RFC 6455.
///
/// The payload is always held in plaintext. A frame carrying a masking key is
/// masked on the wire by [`Frame::encode`] and was unmasked by
/// [`Frame::decode`].
///
/// ## Frame Structure
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Must be 0 unless extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must be 0 unless extension is negotiated.
    pub rsv2: bool,
    /// Reserved bit 3. Must be 0 unless extension is negotiated.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload: Bytes,
}

impl Frame {
    /// Create an unmasked frame with no reserved bits set.
    ///
    /// No shape checks are made here; prefer the typed constructors for
    /// frames sent to a peer.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Create a final text frame. `&str` and `String` are UTF-8 by construction.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self::new(true, OpCode::Text, text)
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Binary, data)
    }

    /// Create a ping frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::ControlPayloadTooLarge` if the payload exceeds 125 bytes.
    pub fn ping(data: impl Into<Bytes>) -> Result<Self> {
        Self::control(OpCode::Ping, data.into())
    }

    /// Create a pong frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::ControlPayloadTooLarge` if the payload exceeds 125 bytes.
    pub fn pong(data: impl Into<Bytes>) -> Result<Self> {
        Self::control(OpCode::Pong, data.into())
    }

    /// Create the pong answering `ping`, carrying the same application data.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAPing` if `ping` is not a Ping frame.
    pub fn pong_for(ping: &Frame) -> Result<Self> {
        if ping.opcode != OpCode::Ping {
            return Err(Error::NotAPing(ping.opcode));
        }
        Self::control(OpCode::Pong, ping.payload.clone())
    }

    /// Create a close frame with a status code and reason.
    ///
    /// # Errors
    ///
    /// - `Error::UnsendableCloseCode` if `code` may not appear on the wire
    /// - `Error::ControlPayloadTooLarge` if the reason is longer than 123 bytes
    pub fn close(code: CloseCode, reason: &str) -> Result<Self> {
        if !code.is_sendable() {
            return Err(Error::UnsendableCloseCode(code.as_u16()));
        }
        if reason.len() > MAX_CLOSE_REASON {
            return Err(Error::ControlPayloadTooLarge(reason.len() + 2));
        }
        let payload = CloseFrame::new(code, reason).to_payload();
        Ok(Self::new(true, OpCode::Close, payload))
    }

    fn control(opcode: OpCode, payload: Bytes) -> Result<Self> {
        if payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlPayloadTooLarge(payload.len()));
        }
        Ok(Self::new(true, opcode, payload))
    }

    /// Attach a masking key, as a client would before sending.
    #[must_use]
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    /// Attach a cryptographically random masking key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the operating system RNG is unavailable.
    pub fn masked(self) -> Result<Self> {
        let mut key = [0u8; 4];
        getrandom::getrandom(&mut key).map_err(|e| Error::Io(e.to_string()))?;
        Ok(self.with_mask(key))
    }

    /// The masking key, if the frame is masked.
    #[inline]
    #[must_use]
    pub fn mask(&self) -> Option<[u8; 4]> {
        self.mask
    }

    /// Whether the frame is (or was, on the wire) masked.
    #[inline]
    #[must_use]
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Check if this is a control frame.
    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.opcode.is_control()
    }

    /// Get the plaintext payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// The header this frame is sent with.
    #[must_use]
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            fin: self.fin,
            rsv1: self.rsv1,
            rsv2: self.rsv2,
            rsv3: self.rsv3,
            opcode: self.opcode,
            masked: self.mask.is_some(),
            payload_len: self.payload.len() as u64,
        }
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Calculate the size needed to encode this frame.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let payload_len = self.payload.len();
        let extended_len_size = if payload_len <= MAX_CONTROL_FRAME_PAYLOAD {
            0
        } else if payload_len <= usize::from(u16::MAX) {
            2
        } else {
            8
        };
        let mask_size = if self.mask.is_some() { 4 } else { 0 };
        2 + extended_len_size + mask_size + payload_len
    }

    /// Append the wire form of this frame to `dst`.
    ///
    /// Header bits are written as FIN, RSV1-3, OPCODE, then MASK and the
    /// length indicator. The masking key follows the length and the payload
    /// comes last, masked in the output only.
    pub fn encode(&self, dst: &mut BytesMut) {
        let payload_len = self.payload.len();
        dst.reserve(self.encoded_len());

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= FIN_BIT;
        }
        if self.rsv1 {
            byte0 |= RSV1_BIT;
        }
        if self.rsv2 {
            byte0 |= RSV2_BIT;
        }
        if self.rsv3 {
            byte0 |= RSV3_BIT;
        }
        dst.put_u8(byte0);

        let mask_bit = if self.mask.is_some() { MASK_BIT } else { 0 };
        if payload_len <= MAX_CONTROL_FRAME_PAYLOAD {
            dst.put_u8(mask_bit | payload_len as u8);
        } else if let Ok(len) = u16::try_from(payload_len) {
            dst.put_u8(mask_bit | LEN_16);
            dst.put_u16(len);
        } else {
            dst.put_u8(mask_bit | LEN_64);
            dst.put_u64(payload_len as u64);
        }

        if let Some(key) = self.mask {
            dst.put_slice(&key);
        }
        let payload_start = dst.len();
        dst.put_slice(&self.payload);
        if let Some(key) = self.mask {
            apply_mask_fast(&mut dst[payload_start..], key);
        }
    }

    /// Encode this frame into a freshly allocated buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

#[cfg(feature = "async-tokio")]
mod decode {
    use tokio::io::{AsyncRead, AsyncReadExt};

    use super::*;

    impl Frame {
        /// Read exactly one frame from `io`.
        ///
        /// Reads the 2 header bytes, then the extended length (if any), the
        /// masking key (if masked) and finally the payload, which is unmasked
        /// before returning. Payloads announced larger than `max_frame_size`
        /// are refused before anything is allocated for them; if such a
        /// header also breaks a [`FrameValidator`] rule, that rule's error is
        /// returned instead so the peer gets the matching close code.
        ///
        /// # Errors
        ///
        /// - `Error::Io` on any short read or transport failure
        /// - `Error::InvalidPayloadLength` if a 64-bit length has its top bit set
        /// - `Error::FrameTooLarge` if the payload exceeds `max_frame_size`
        /// - any header error of [`FrameValidator::validate_header`] for an
        ///   oversized frame
        pub async fn decode<R>(io: &mut R, max_frame_size: usize) -> Result<Frame>
        where
            R: AsyncRead + Unpin,
        {
            let mut header = [0u8; 2];
            io.read_exact(&mut header).await?;

            let [byte0, byte1] = header;
            let masked = byte1 & MASK_BIT != 0;

            let payload_len = match byte1 & 0x7F {
                LEN_16 => u64::from(io.read_u16().await?),
                LEN_64 => {
                    let len = io.read_u64().await?;
                    if len & (1 << 63) != 0 {
                        return Err(Error::InvalidPayloadLength(len));
                    }
                    len
                }
                len => u64::from(len),
            };

            let header = FrameHeader {
                fin: byte0 & FIN_BIT != 0,
                rsv1: byte0 & RSV1_BIT != 0,
                rsv2: byte0 & RSV2_BIT != 0,
                rsv3: byte0 & RSV3_BIT != 0,
                opcode: OpCode::from_u8(byte0),
                masked,
                payload_len,
            };

            let payload_len = match usize::try_from(payload_len) {
                Ok(len) if len <= max_frame_size => len,
                _ => {
                    FrameValidator::new().validate_header(&header)?;
                    return Err(Error::FrameTooLarge {
                        size: header.payload_len,
                        max: max_frame_size,
                    });
                }
            };

            let mask = if masked {
                let mut key = [0u8; 4];
                io.read_exact(&mut key).await?;
                Some(key)
            } else {
                None
            };

            let mut payload = BytesMut::zeroed(payload_len);
            io.read_exact(&mut payload).await?;
            if let Some(key) = mask {
                apply_mask_fast(&mut payload, key);
            }

            Ok(Frame {
                fin: header.fin,
                rsv1: header.rsv1,
                rsv2: header.rsv2,
                rsv3: header.rsv3,
                opcode: header.opcode,
                mask,
                payload: payload.freeze(),
            })
        }
    }
}
