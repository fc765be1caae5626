//! Lifecycle of a server-side WebSocket session.

/// Session state.
///
/// A session starts `Open` on an already upgraded stream. Sending a Close
/// moves it to `Closing`; releasing the transport, for any reason, moves it
/// to `Closed`, which is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Open for data in both directions.
    #[default]
    Open,
    /// We sent a Close; the peer's answering Close is still expected.
    Closing,
    /// The transport has been released.
    Closed,
}

impl ConnectionState {
    /// Check if sending data frames is allowed in this state.
    #[must_use]
    #[inline]
    pub const fn can_send_data(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if frames may still be read or control frames written.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
