//! Message reassembly and control-frame handling for incoming frames.
//!
//! The protocol state between frames is an explicit [`AssemblyState`] value
//! threaded through [`AssemblyState::step`]. Each step consumes one validated
//! frame and yields the next state together with a [`Transition`] telling the
//! receive loop what to do: keep reading, write a reply, surface a message, or
//! finish the close handshake.

use bytes::{Bytes, BytesMut};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, MAX_CLOSE_REASON, Message};
use crate::protocol::utf8::{Utf8Validator, validate_utf8};
use crate::protocol::validation::FrameValidator;
use crate::protocol::{Frame, OpCode};

/// Reassembly state of one connection.
#[derive(Debug, Default)]
pub enum AssemblyState {
    /// No fragmented message is pending.
    #[default]
    Idle,
    /// A Text or Binary frame with FIN=0 was received; continuations follow.
    InProgress {
        /// Opcode of the initial frame.
        opcode: OpCode,
        /// Payload accumulated so far.
        buffer: BytesMut,
        /// Incremental validator, present for text messages.
        utf8: Option<Utf8Validator>,
        /// Number of frames accumulated so far.
        fragments: usize,
    },
}

/// Outcome of feeding one frame to the state machine.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to surface yet.
    Pending,
    /// Write this frame back to the peer, then keep reading.
    Reply(Frame),
    /// A complete data message.
    Message(Message),
    /// The peer sent Close. `reply` echoes its status and reason.
    Closed {
        /// The echoing Close frame.
        reply: Frame,
        /// The peer's status and reason, if it sent any.
        close: Option<CloseFrame>,
    },
}

impl AssemblyState {
    /// Whether a fragmented message is pending.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        matches!(self, AssemblyState::InProgress { .. })
    }

    /// Advance the state machine by one frame.
    ///
    /// Control frames are handled without disturbing a pending message.
    ///
    /// # Errors
    ///
    /// - `Error::UnexpectedContinuation` for a continuation while idle
    /// - `Error::ExpectedContinuation` for a new data frame mid-message
    /// - `Error::InvalidUtf8` for a text message that is not UTF-8
    /// - `Error::MessageTooLarge` / `Error::TooManyFragments` when a limit is hit
    /// - Close payload errors, see [`CloseFrame::parse`]
    pub fn step(self, frame: Frame, limits: &Limits) -> Result<(Self, Transition)> {
        match frame.opcode {
            OpCode::Ping => {
                let reply = Frame::pong_for(&frame)?;
                Ok((self, Transition::Reply(reply)))
            }
            OpCode::Pong => Ok((self, Transition::Pending)),
            OpCode::Close => {
                let close = CloseFrame::parse(frame.payload())?;
                let payload = match &close {
                    Some(close) if close.code.is_sendable() => close.to_payload(),
                    Some(close) => CloseFrame::new(CloseCode::Normal, close.reason.as_str()).to_payload(),
                    None => CloseFrame::new(CloseCode::Normal, "").to_payload(),
                };
                let reply = Frame::new(true, OpCode::Close, payload);
                Ok((AssemblyState::Idle, Transition::Closed { reply, close }))
            }
            OpCode::Reserved(byte) => Err(Error::ReservedOpcode(byte)),
            OpCode::Continuation => match self {
                AssemblyState::Idle => Err(Error::UnexpectedContinuation),
                AssemblyState::InProgress {
                    opcode,
                    buffer,
                    utf8,
                    fragments,
                } => append(opcode, buffer, utf8, fragments, frame, limits),
            },
            OpCode::Text | OpCode::Binary => match self {
                AssemblyState::InProgress { .. } => Err(Error::ExpectedContinuation),
                AssemblyState::Idle if frame.fin => {
                    limits.check_message_size(frame.payload_len())?;
                    let message = complete(frame.opcode, frame.into_payload())?;
                    Ok((AssemblyState::Idle, Transition::Message(message)))
                }
                AssemblyState::Idle => {
                    let utf8 = (frame.opcode == OpCode::Text).then(Utf8Validator::new);
                    append(frame.opcode, BytesMut::new(), utf8, 0, frame, limits)
                }
            },
        }
    }
}

fn append(
    opcode: OpCode,
    mut buffer: BytesMut,
    mut utf8: Option<Utf8Validator>,
    fragments: usize,
    frame: Frame,
    limits: &Limits,
) -> Result<(AssemblyState, Transition)> {
    let fragments = fragments + 1;
    limits.check_fragment_count(fragments)?;
    limits.check_message_size(buffer.len() + frame.payload_len())?;

    if let Some(validator) = utf8.as_mut() {
        validator.feed(frame.payload(), frame.fin)?;
    }
    buffer.extend_from_slice(frame.payload());

    if frame.fin {
        let message = complete(opcode, buffer.freeze())?;
        return Ok((AssemblyState::Idle, Transition::Message(message)));
    }

    Ok((
        AssemblyState::InProgress {
            opcode,
            buffer,
            utf8,
            fragments,
        },
        Transition::Pending,
    ))
}

fn complete(opcode: OpCode, payload: Bytes) -> Result<Message> {
    match opcode {
        OpCode::Text => {
            let text = validate_utf8(&payload)?;
            Ok(Message::Text(text.to_owned()))
        }
        _ => Ok(Message::Binary(payload)),
    }
}

/// Turns a stream of client frames into messages.
///
/// Every frame is checked by [`FrameValidator`] before it reaches the state
/// machine. Any error returned is terminal for the connection.
#[derive(Debug)]
pub struct MessageAssembler {
    state: AssemblyState,
    validator: FrameValidator,
    limits: Limits,
    echo_close: bool,
}

impl MessageAssembler {
    /// Create an idle assembler enforcing `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            state: AssemblyState::Idle,
            validator: FrameValidator::new(),
            limits,
            echo_close: true,
        }
    }

    /// Validate a frame and advance the state machine.
    pub fn push(&mut self, frame: Frame) -> Result<Transition> {
        self.validator.validate(&frame)?;
        let state = std::mem::take(&mut self.state);
        let (next, transition) = state.step(frame, &self.limits)?;
        self.state = next;
        Ok(transition)
    }

    /// Whether a fragmented message is pending.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.state.is_assembling()
    }

    /// Stop echoing the peer's Close, used once we have sent our own.
    pub fn disable_close_echo(&mut self) {
        self.echo_close = false;
    }
}

/// Reason text sent in the Close frame that reports `err` to the peer.
#[must_use]
pub fn close_reason(err: &Error) -> String {
    let mut reason = err.to_string();
    if reason.len() > MAX_CLOSE_REASON {
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

#[cfg(feature = "async-tokio")]
mod receive {
    use log::{debug, warn};
    use tokio::io::{AsyncRead, AsyncWrite};

    use super::*;
    use crate::codec::FrameCodec;

    impl MessageAssembler {
        /// Read frames until a complete message or the peer's Close arrives.
        ///
        /// Pings are answered before the next read and pongs are dropped. A
        /// protocol, data or capacity error is reported to the peer with a
        /// Close frame (best effort) before it is returned.
        pub async fn next_message<T>(&mut self, codec: &mut FrameCodec<T>) -> Result<Message>
        where
            T: AsyncRead + AsyncWrite + Unpin,
        {
            match self.read_message(codec).await {
                Err(err) => {
                    if let Some(code) = err.close_code() {
                        warn!("failing connection with {code}: {err}");
                        fail_connection(codec, code, &err).await;
                    }
                    Err(err)
                }
                ok => ok,
            }
        }

        async fn read_message<T>(&mut self, codec: &mut FrameCodec<T>) -> Result<Message>
        where
            T: AsyncRead + AsyncWrite + Unpin,
        {
            loop {
                let frame = codec.read_frame().await?;
                match self.push(frame)? {
                    Transition::Pending => {}
                    Transition::Reply(reply) => {
                        codec.write_frame(&reply).await?;
                        codec.flush().await?;
                    }
                    Transition::Message(message) => return Ok(message),
                    Transition::Closed { reply, close } => {
                        debug!("peer sent close: {close:?}");
                        if self.echo_close {
                            if let Err(err) = write_now(codec, &reply).await {
                                warn!("failed to echo close: {err}");
                            }
                        }
                        return Ok(Message::Close(close));
                    }
                }
            }
        }
    }

    async fn fail_connection<T>(codec: &mut FrameCodec<T>, code: CloseCode, err: &Error)
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let result = match Frame::close(code, &close_reason(err)) {
            Ok(frame) => write_now(codec, &frame).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("failed to send close {code}: {e}");
        }
    }

    async fn write_now<T>(codec: &mut FrameCodec<T>, frame: &Frame) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        codec.write_frame(frame).await?;
        codec.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

    fn client(fin: bool, opcode: OpCode, payload: &[u8]) -> Frame {
        Frame::new(fin, opcode, payload.to_vec()).with_mask(KEY)
    }

    fn small_limits() -> Limits {
        Limits::new(1024, 100, 3)
    }

    fn message(transition: Transition) -> Message {
        match transition {
            Transition::Message(message) => message,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn test_single_frame_message() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(true, OpCode::Text, b"hi")).unwrap();
        assert_eq!(message(result), Message::text("hi"));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_zero_mask_key() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let frame = Frame::new(true, OpCode::Text, &b"hi"[..]).with_mask([0, 0, 0, 0]);
        assert_eq!(message(assembler.push(frame).unwrap()), Message::text("hi"));
    }

    #[test]
    fn test_two_fragment_message() {
        let mut assembler = MessageAssembler::new(Limits::default());

        let first = assembler.push(client(false, OpCode::Text, b"AB")).unwrap();
        assert_eq!(first, Transition::Pending);
        assert!(assembler.is_assembling());

        let second = assembler.push(client(true, OpCode::Continuation, b"CD")).unwrap();
        assert_eq!(message(second), Message::text("ABCD"));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_many_fragments() {
        let mut assembler = MessageAssembler::new(Limits::default());
        assembler.push(client(false, OpCode::Binary, &[1, 2])).unwrap();
        assembler.push(client(false, OpCode::Continuation, &[3, 4])).unwrap();
        assembler.push(client(false, OpCode::Continuation, &[])).unwrap();
        let result = assembler.push(client(true, OpCode::Continuation, &[5])).unwrap();
        assert_eq!(message(result), Message::binary(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_ping_between_fragments() {
        let mut assembler = MessageAssembler::new(Limits::default());
        assembler.push(client(false, OpCode::Text, b"Hel")).unwrap();

        let reply = assembler.push(client(true, OpCode::Ping, b"ping-data")).unwrap();
        assert_eq!(reply, Transition::Reply(Frame::pong(&b"ping-data"[..]).unwrap()));
        assert!(assembler.is_assembling());

        let pong = assembler.push(client(true, OpCode::Pong, b"")).unwrap();
        assert_eq!(pong, Transition::Pending);

        let result = assembler.push(client(true, OpCode::Continuation, b"lo")).unwrap();
        assert_eq!(message(result), Message::text("Hello"));
    }

    #[test]
    fn test_close_without_status_echoes_normal() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(true, OpCode::Close, b"")).unwrap();
        let Transition::Closed { reply, close } = result else {
            panic!("expected close");
        };
        assert_eq!(close, None);
        assert_eq!(reply.opcode, OpCode::Close);
        assert_eq!(reply.payload(), &[0x03, 0xe8]);
    }

    #[test]
    fn test_close_echoes_status_and_reason() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler
            .push(client(true, OpCode::Close, b"\x0b\xb8app"))
            .unwrap();
        let Transition::Closed { reply, close } = result else {
            panic!("expected close");
        };
        assert_eq!(close, Some(CloseFrame::new(CloseCode::Other(3000), "app")));
        assert_eq!(reply.payload(), b"\x0b\xb8app");
    }

    #[test]
    fn test_close_1015_echoed_as_normal() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler
            .push(client(true, OpCode::Close, b"\x03\xf7tls"))
            .unwrap();
        let Transition::Closed { reply, close } = result else {
            panic!("expected close");
        };
        assert_eq!(close, Some(CloseFrame::new(CloseCode::Other(1015), "tls")));
        assert_eq!(reply.payload(), b"\x03\xe8tls");
    }

    #[test]
    fn test_close_with_reserved_status() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(true, OpCode::Close, &[0x03, 0xed]));
        assert_eq!(result, Err(Error::InvalidCloseCode(1005)));
    }

    #[test]
    fn test_unmasked_frame_fails() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(Frame::text("hi"));
        assert_eq!(result, Err(Error::UnmaskedClientFrame));
    }

    #[test]
    fn test_continuation_without_start_fails() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(true, OpCode::Continuation, b"data"));
        assert_eq!(result, Err(Error::UnexpectedContinuation));
    }

    #[test]
    fn test_new_message_without_continuation_fails() {
        let mut assembler = MessageAssembler::new(Limits::default());
        assembler.push(client(false, OpCode::Text, b"first")).unwrap();
        let result = assembler.push(client(true, OpCode::Binary, b"second"));
        assert_eq!(result, Err(Error::ExpectedContinuation));
    }

    #[test]
    fn test_text_split_code_point() {
        let mut assembler = MessageAssembler::new(Limits::default());
        assembler.push(client(false, OpCode::Text, &[0xf0, 0x9f])).unwrap();
        let result = assembler
            .push(client(true, OpCode::Continuation, &[0x8e, 0x89]))
            .unwrap();
        assert_eq!(message(result), Message::text("🎉"));
    }

    #[test]
    fn test_invalid_utf8_fails_fast() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(false, OpCode::Text, &[0x41, 0xff]));
        assert_eq!(result, Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_invalid_utf8_single_frame() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler.push(client(true, OpCode::Text, &[0x80, 0x81]));
        assert_eq!(result, Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_truncated_code_point_at_end_fails() {
        let mut assembler = MessageAssembler::new(Limits::default());
        assembler.push(client(false, OpCode::Text, b"ok")).unwrap();
        let result = assembler.push(client(true, OpCode::Continuation, &[0xe2, 0x82]));
        assert_eq!(result, Err(Error::InvalidUtf8));
    }

    #[test]
    fn test_binary_not_utf8_checked() {
        let mut assembler = MessageAssembler::new(Limits::default());
        let result = assembler
            .push(client(true, OpCode::Binary, &[0x80, 0x81, 0xff]))
            .unwrap();
        assert_eq!(message(result), Message::binary(vec![0x80, 0x81, 0xff]));
    }

    #[test]
    fn test_max_message_size_exceeded() {
        let mut assembler = MessageAssembler::new(small_limits());
        let result = assembler.push(client(true, OpCode::Binary, &[0u8; 150]));
        assert_eq!(result, Err(Error::MessageTooLarge { size: 150, max: 100 }));

        let mut assembler = MessageAssembler::new(small_limits());
        assembler.push(client(false, OpCode::Binary, &[0u8; 60])).unwrap();
        let result = assembler.push(client(true, OpCode::Continuation, &[0u8; 60]));
        assert_eq!(result, Err(Error::MessageTooLarge { size: 120, max: 100 }));
    }

    #[test]
    fn test_max_fragment_count_exceeded() {
        let mut assembler = MessageAssembler::new(small_limits());
        assembler.push(client(false, OpCode::Binary, &[1])).unwrap();
        assembler.push(client(false, OpCode::Continuation, &[2])).unwrap();
        assembler.push(client(false, OpCode::Continuation, &[3])).unwrap();
        let result = assembler.push(client(true, OpCode::Continuation, &[4]));
        assert_eq!(result, Err(Error::TooManyFragments { count: 4, max: 3 }));
    }

    #[test]
    fn test_step_is_pure() {
        let limits = Limits::default();
        let state = AssemblyState::Idle;
        let (state, transition) = state
            .step(Frame::new(false, OpCode::Binary, &b"a"[..]), &limits)
            .unwrap();
        assert_eq!(transition, Transition::Pending);
        assert!(state.is_assembling());

        let (state, transition) = state
            .step(Frame::new(true, OpCode::Continuation, &b"b"[..]), &limits)
            .unwrap();
        assert_eq!(transition, Transition::Message(Message::binary(&b"ab"[..])));
        assert!(!state.is_assembling());
    }

    #[test]
    fn test_close_reason_truncated_on_char_boundary() {
        let err = Error::InvalidHandshake("é".repeat(100));
        let reason = close_reason(&err);
        assert!(reason.len() <= MAX_CLOSE_REASON);
        assert!(reason.len() >= MAX_CLOSE_REASON - 1);
        assert!(reason.starts_with("Invalid handshake: "));

        assert_eq!(close_reason(&Error::InvalidUtf8), "Invalid UTF-8 in text message");
    }

    #[cfg(feature = "async-tokio")]
    mod io {
        use super::*;
        use crate::codec::{FrameCodec, MockStream};
        use crate::config::Config;

        fn wire(frames: &[Frame]) -> Vec<u8> {
            frames.iter().flat_map(|f| f.to_bytes().to_vec()).collect()
        }

        fn codec(frames: &[Frame]) -> FrameCodec<MockStream> {
            FrameCodec::new(MockStream::new(wire(frames)), &Config::default())
        }

        #[tokio::test]
        async fn test_ping_answered_before_message() {
            let mut codec = codec(&[
                client(true, OpCode::Ping, b"ping-data"),
                client(true, OpCode::Text, b"hi"),
            ]);
            let mut assembler = MessageAssembler::new(Limits::default());

            let msg = assembler.next_message(&mut codec).await.unwrap();
            assert_eq!(msg, Message::text("hi"));
            assert_eq!(
                codec.get_ref().write_data,
                Frame::pong(&b"ping-data"[..]).unwrap().to_bytes().to_vec()
            );
        }

        #[tokio::test]
        async fn test_violation_sends_close_1002() {
            let mut codec = codec(&[Frame::text("hi")]);
            let mut assembler = MessageAssembler::new(Limits::default());

            let result = assembler.next_message(&mut codec).await;
            assert_eq!(result, Err(Error::UnmaskedClientFrame));

            let written = &codec.get_ref().write_data;
            assert_eq!(written[0], 0x88);
            assert_eq!(&written[2..4], &[0x03, 0xea]);
            assert_eq!(&written[4..], b"Client frame must be masked");
        }

        #[tokio::test]
        async fn test_bad_utf8_sends_close_1007() {
            let mut codec = codec(&[client(true, OpCode::Text, &[0xff])]);
            let mut assembler = MessageAssembler::new(Limits::default());

            let result = assembler.next_message(&mut codec).await;
            assert_eq!(result, Err(Error::InvalidUtf8));
            assert_eq!(&codec.get_ref().write_data[2..4], &[0x03, 0xef]);
        }

        #[tokio::test]
        async fn test_oversized_frame_sends_close_1009() {
            let config = Config::new().with_limits(Limits::new(4, 100, 4));
            let data = wire(&[client(true, OpCode::Binary, b"too long")]);
            let mut codec = FrameCodec::new(MockStream::new(data), &config);
            let mut assembler = MessageAssembler::new(config.limits);

            let result = assembler.next_message(&mut codec).await;
            assert_eq!(result, Err(Error::FrameTooLarge { size: 8, max: 4 }));
            assert_eq!(&codec.get_ref().write_data[2..4], &[0x03, 0xf1]);
        }

        #[tokio::test]
        async fn test_transport_error_sends_nothing() {
            let mut codec = codec(&[]);
            let mut assembler = MessageAssembler::new(Limits::default());

            let result = assembler.next_message(&mut codec).await;
            assert!(matches!(result, Err(Error::Io(_))));
            assert!(codec.get_ref().write_data.is_empty());
        }

        #[tokio::test]
        async fn test_peer_close_is_echoed() {
            let mut codec = codec(&[client(true, OpCode::Close, b"")]);
            let mut assembler = MessageAssembler::new(Limits::default());

            let msg = assembler.next_message(&mut codec).await.unwrap();
            assert_eq!(msg, Message::Close(None));
            assert_eq!(codec.get_ref().write_data, vec![0x88, 0x02, 0x03, 0xe8]);
        }

        #[tokio::test]
        async fn test_peer_close_not_echoed_when_disabled() {
            let mut codec = codec(&[client(true, OpCode::Close, b"\x03\xe8")]);
            let mut assembler = MessageAssembler::new(Limits::default());
            assembler.disable_close_echo();

            let msg = assembler.next_message(&mut codec).await.unwrap();
            assert_eq!(msg, Message::Close(Some(CloseFrame::new(CloseCode::Normal, ""))));
            assert!(codec.get_ref().write_data.is_empty());
        }
    }
}
