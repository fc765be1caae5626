//! Server-side WebSocket session and outgoing message fragmentation.
//!
//! ## Session Lifecycle
//!
//! 1. **Open** - Initial state on an upgraded stream
//! 2. **Closing** - Close frame sent, waiting for peer close
//! 3. **Closed** - Transport released
//!
//! ## Example
//!
//! ```rust,ignore
//! use wsock::{CloseCode, Config, Session};
//!
//! let mut session = Session::new(stream, request_headers, Config::default());
//! session.send_text("Hello").await?;
//! let reply = session.receive_text().await?;
//! session.close_with_code(CloseCode::Normal, "done").await?;
//! ```

pub mod fragmenter;
mod state;

pub use fragmenter::MessageFragmenter;
pub use state::ConnectionState;

#[cfg(feature = "async-tokio")]
mod session;

#[cfg(feature = "async-tokio")]
pub use session::Session;
