//! # wsock - Server-side WebSocket frame codec and protocol state machine
//!
//! `wsock` implements the data framing half of RFC 6455 for servers: it takes
//! a stream that has already completed the HTTP upgrade and turns it into a
//! sequence of complete messages.
//!
//! ## Features
//!
//! - **Strict client frame validation**: masking, control frame shape,
//!   reserved opcodes and bits, close payloads
//! - **Fragment reassembly** with fail-fast UTF-8 checking of text
//! - **Inline control frames**: pings answered, closes echoed
//! - **Every violation reported** to the peer with the right close code
//! - **Resource limits** on frame size, message size and fragment count
//! - **Upgrade helpers** to validate the request and build the `101` reply
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsock::{Config, Message, Session, accept_response};
//!
//! let response = accept_response(request.headers())?;
//! // ... write `response`, then take over the raw stream ...
//! let mut session = Session::new(stream, request.headers().clone(), Config::default());
//! while let Message::Text(text) = session.receive_message().await? {
//!     session.send_text(&text).await?;
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

#[cfg(feature = "async-tokio")]
pub mod codec;

pub use config::{Config, Limits};
pub use connection::{ConnectionState, MessageFragmenter};
#[cfg(feature = "async-tokio")]
pub use connection::Session;
pub use error::{Error, ErrorKind, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{
    Frame, FrameValidator, OpCode, WS_GUID, accept_response, compute_accept_key,
    validate_upgrade_request,
};

#[cfg(feature = "async-tokio")]
pub use codec::FrameCodec;
