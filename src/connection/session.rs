use bytes::Bytes;
use http::HeaderMap;
use http::header::SEC_WEBSOCKET_EXTENSIONS;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::FrameCodec;
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::connection::fragmenter::MessageFragmenter;
use crate::error::{Error, Result};
use crate::message::{CloseCode, Message};
use crate::protocol::assembler::MessageAssembler;
use crate::protocol::utf8::validate_utf8;
use crate::protocol::{Frame, OpCode};

/// A server-side WebSocket session over an already upgraded stream.
///
/// `Session` owns the transport and the receive state machine. Every
/// operation takes `&mut self`, so there is exactly one reader and one writer
/// at a time. Any transport error, and any protocol violation by the peer,
/// releases the transport; from then on every operation returns
/// `Error::ConnectionClosed`.
///
/// ## Example
///
/// ```rust,ignore
/// use wsock::{Config, Message, Session};
///
/// let mut session = Session::new(stream, request_headers, Config::default());
/// loop {
///     match session.receive_message().await? {
///         Message::Text(text) => session.send_text(&text).await?,
///         Message::Binary(data) => session.send_binary(data).await?,
///         Message::Close(_) => break,
///         _ => {}
///     }
/// }
/// ```
pub struct Session<T> {
    codec: Option<FrameCodec<T>>,
    assembler: MessageAssembler,
    headers: HeaderMap,
    state: ConnectionState,
    close_status: CloseCode,
}

impl<T: AsyncRead> Session<T> {
    /// Wrap an upgraded stream.
    ///
    /// `headers` are the upgrade request headers. Extensions the client asks
    /// for are never negotiated; a request for them is logged and ignored.
    pub fn new(io: T, headers: HeaderMap, config: Config) -> Self {
        if let Some(extensions) = headers.get(SEC_WEBSOCKET_EXTENSIONS) {
            info!("client requested extensions {extensions:?}; none are supported");
        }
        Self {
            codec: Some(FrameCodec::new(io, &config)),
            assembler: MessageAssembler::new(config.limits),
            headers,
            state: ConnectionState::Open,
            close_status: CloseCode::Normal,
        }
    }
}

impl<T> Session<T> {
    /// Get the upgrade request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the current session state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Status this side closes with: 1000 until a close is started or a
    /// peer violation is reported.
    pub fn close_status(&self) -> CloseCode {
        self.close_status
    }

    /// Check if the transport is still held.
    pub fn is_open(&self) -> bool {
        self.state.is_active()
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Session<T> {
    /// Send a single-frame text message.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_data(&[Frame::text(text)]).await
    }

    /// Send a single-frame binary message.
    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> Result<()> {
        self.send_data(&[Frame::binary(data)]).await
    }

    /// Send a message split into frames of at most `max_frame_size` bytes.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidFragmentSize` if `max_frame_size` is zero
    /// - `Error::InvalidMessageOpcode` if `opcode` is not Text or Binary
    /// - `Error::InvalidText` if `opcode` is Text and `data` is not UTF-8
    ///
    /// None of these touch the connection.
    pub async fn send_fragmented(
        &mut self,
        data: impl Into<Bytes>,
        max_frame_size: usize,
        opcode: OpCode,
    ) -> Result<()> {
        let data = data.into();
        let fragmenter = MessageFragmenter::new(data.clone(), opcode, max_frame_size)?;
        if opcode == OpCode::Text {
            validate_utf8(&data).map_err(|_| Error::InvalidText)?;
        }
        let frames: Vec<Frame> = fragmenter.collect();
        self.send_data(&frames).await
    }

    /// Start the close handshake without releasing the transport.
    ///
    /// Data sends are refused afterwards. Keep calling
    /// [`receive_message`](Self::receive_message) to read the peer's answering
    /// Close, which is not echoed.
    pub async fn send_close(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        let frame = Frame::close(code, reason)?;
        if !self.state.can_send_data() {
            return Err(Error::ConnectionClosed);
        }
        self.close_status = code;
        self.write(&[frame]).await?;
        debug!("sent close {code}");
        self.state = ConnectionState::Closing;
        self.assembler.disable_close_echo();
        Ok(())
    }

    /// Send a ping carrying up to 125 bytes of application data.
    pub async fn send_ping(&mut self, data: impl Into<Bytes>) -> Result<()> {
        let frame = Frame::ping(data)?;
        self.write(&[frame]).await
    }

    /// Answer `ping` with a pong carrying the same data.
    ///
    /// Pings read by [`receive_message`](Self::receive_message) are already
    /// answered; this is for pings observed elsewhere.
    pub async fn send_pong(&mut self, ping: &Frame) -> Result<()> {
        let frame = Frame::pong_for(ping)?;
        self.write(&[frame]).await
    }

    /// Receive the next complete message.
    ///
    /// Pings are answered and pongs dropped along the way. A peer Close is
    /// echoed (unless we started the close handshake), the transport is
    /// released, and `Message::Close` is returned.
    ///
    /// # Errors
    ///
    /// A protocol violation is reported to the peer with a Close frame before
    /// the transport is released and the error returned. Transport errors
    /// release the transport without a Close.
    pub async fn receive_message(&mut self) -> Result<Message> {
        let codec = self.codec.as_mut().ok_or(Error::ConnectionClosed)?;
        match self.assembler.next_message(codec).await {
            Ok(message) => {
                if message.is_close() {
                    self.release().await;
                }
                Ok(message)
            }
            Err(err) => {
                if let Some(code) = err.close_code() {
                    self.close_status = code;
                }
                self.release().await;
                Err(err)
            }
        }
    }

    /// Receive the next message, which must be text.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedMessage` if another kind of message arrives.
    pub async fn receive_text(&mut self) -> Result<String> {
        match self.receive_message().await? {
            Message::Text(text) => Ok(text),
            other => Err(Error::UnexpectedMessage {
                expected: OpCode::Text,
                actual: other.opcode(),
            }),
        }
    }

    /// Receive the next message, which must be binary.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedMessage` if another kind of message arrives.
    pub async fn receive_binary(&mut self) -> Result<Bytes> {
        match self.receive_message().await? {
            Message::Binary(data) => Ok(data),
            other => Err(Error::UnexpectedMessage {
                expected: OpCode::Binary,
                actual: other.opcode(),
            }),
        }
    }

    /// Close with the pending [`close_status`](Self::close_status) and
    /// release the transport.
    pub async fn close(&mut self) -> Result<()> {
        self.close_with_code(self.close_status, "").await
    }

    /// Send a Close with `code` and `reason`, then release the transport.
    ///
    /// The Close is best effort: a failed write is logged, not returned. The
    /// transport is released even when `code` or `reason` cannot be sent, in
    /// which case that construction error is returned.
    pub async fn close_with_code(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        let Some(codec) = self.codec.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        let frame = Frame::close(code, reason);
        if frame.is_ok() {
            self.close_status = code;
        }
        match &frame {
            Ok(frame) if self.state == ConnectionState::Open => {
                if let Err(err) = write_frames(codec, std::slice::from_ref(frame)).await {
                    warn!("failed to send close {code}: {err}");
                }
            }
            Ok(_) => {}
            Err(err) => warn!("cannot send close {code}: {err}"),
        }

        self.release().await;
        frame.map(drop)
    }

    async fn send_data(&mut self, frames: &[Frame]) -> Result<()> {
        if !self.state.can_send_data() {
            return Err(Error::ConnectionClosed);
        }
        self.write(frames).await
    }

    async fn write(&mut self, frames: &[Frame]) -> Result<()> {
        let codec = self.codec.as_mut().ok_or(Error::ConnectionClosed)?;
        if let Err(err) = write_frames(codec, frames).await {
            self.release().await;
            return Err(err);
        }
        Ok(())
    }

    async fn release(&mut self) {
        self.state = ConnectionState::Closed;
        if let Some(mut codec) = self.codec.take() {
            if let Err(err) = codec.shutdown().await {
                debug!("shutdown after close failed: {err}");
            }
            debug!("released transport");
        }
    }
}

async fn write_frames<T>(codec: &mut FrameCodec<T>, frames: &[Frame]) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    for frame in frames {
        codec.write_frame(frame).await?;
    }
    codec.flush().await
}
