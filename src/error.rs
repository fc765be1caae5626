//! Error types for the WebSocket protocol core.
//!
//! Every failure is one [`Error`] variant; [`Error::kind`] groups them into the
//! taxonomy the connection reacts to, and [`Error::close_code`] names the
//! status code the peer is told about before the transport is released.

use thiserror::Error;

use crate::message::CloseCode;
use crate::protocol::OpCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The underlying stream failed or ended mid-frame.
    Transport,
    /// A frame-shape or state-machine rule was broken by the peer.
    Protocol,
    /// Payload content (UTF-8) is inconsistent with the frame type.
    DataInconsistency,
    /// A configured resource limit was exceeded by the peer.
    Capacity,
    /// The caller tried to build or read something invalid.
    Construction,
    /// The upgrade request is not a valid WebSocket handshake.
    Handshake,
}

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// I/O error occurred on the transport.
    #[error("I/O error: {0}")]
    Io(String),

    /// The session has already been closed and released its transport.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Client frame arrived without a masking key.
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Control frame with FIN=0.
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload over 125 bytes.
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Opcode 0x3-0x7 or 0xB-0xF.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// RSV bits set while no extension is negotiated.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// 64-bit payload length with the most significant bit set.
    #[error("Invalid payload length: {0:#x} has the most significant bit set")]
    InvalidPayloadLength(u64),

    /// Close frame with a one byte payload.
    #[error("Close frame payload must be empty or at least 2 bytes")]
    InvalidClosePayload,

    /// Close status code outside the ranges allowed on the wire.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Continuation frame with no message in progress.
    #[error("Continuation frame without a preceding data frame")]
    UnexpectedContinuation,

    /// New Text/Binary frame while a fragmented message is pending.
    #[error("New data frame received while a fragmented message is pending")]
    ExpectedContinuation,

    /// Text message payload is not valid UTF-8.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Close reason is not valid UTF-8.
    #[error("Invalid UTF-8 in close reason")]
    InvalidCloseReason,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Announced payload length.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Fragment count so far.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Outgoing text payload is not valid UTF-8.
    #[error("Text payload must be valid UTF-8")]
    InvalidText,

    /// Outgoing control frame payload over 125 bytes.
    #[error("Control payload too large: {0} bytes (max: 125)")]
    ControlPayloadTooLarge(usize),

    /// Fragment size of zero.
    #[error("Fragment size must be greater than zero")]
    InvalidFragmentSize,

    /// Fragmented message started with something other than Text or Binary.
    #[error("Message opcode must be Text or Binary, got {0}")]
    InvalidMessageOpcode(OpCode),

    /// Close code that must not be sent.
    #[error("Close code {0} cannot be sent")]
    UnsendableCloseCode(u16),

    /// Pong requested for a frame that is not a Ping.
    #[error("Expected a Ping frame, got {0}")]
    NotAPing(OpCode),

    /// Typed accessor used on the wrong kind of message.
    #[error("Expected a {expected} message, got {actual}")]
    UnexpectedMessage {
        /// The message type asked for.
        expected: OpCode,
        /// The message type received.
        actual: OpCode,
    },

    /// Invalid WebSocket upgrade request.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::ConnectionClosed => ErrorKind::Transport,
            Error::UnmaskedClientFrame
            | Error::FragmentedControlFrame
            | Error::ControlFrameTooLarge(_)
            | Error::ReservedOpcode(_)
            | Error::ReservedBitsSet
            | Error::InvalidPayloadLength(_)
            | Error::InvalidClosePayload
            | Error::InvalidCloseCode(_)
            | Error::UnexpectedContinuation
            | Error::ExpectedContinuation => ErrorKind::Protocol,
            Error::InvalidUtf8 | Error::InvalidCloseReason => ErrorKind::DataInconsistency,
            Error::FrameTooLarge { .. }
            | Error::MessageTooLarge { .. }
            | Error::TooManyFragments { .. } => ErrorKind::Capacity,
            Error::InvalidText
            | Error::ControlPayloadTooLarge(_)
            | Error::InvalidFragmentSize
            | Error::InvalidMessageOpcode(_)
            | Error::UnsendableCloseCode(_)
            | Error::NotAPing(_)
            | Error::UnexpectedMessage { .. } => ErrorKind::Construction,
            Error::InvalidHandshake(_) => ErrorKind::Handshake,
        }
    }

    /// Status code to send to the peer before tearing the connection down.
    ///
    /// `None` means no Close frame is sent: transport failures abandon the
    /// connection, and local errors leave it untouched.
    #[must_use]
    pub const fn close_code(&self) -> Option<CloseCode> {
        match self.kind() {
            ErrorKind::Protocol => Some(CloseCode::ProtocolError),
            ErrorKind::DataInconsistency => Some(CloseCode::InvalidPayload),
            ErrorKind::Capacity => Some(CloseCode::MessageTooBig),
            ErrorKind::Transport | ErrorKind::Construction | ErrorKind::Handshake => None,
        }
    }

    /// Whether this error ends the connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Construction | ErrorKind::Handshake
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
