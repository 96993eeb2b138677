//! Bridge connection state machine.

/// The bridge's current relationship with the Hub socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open; either never started or cleanly stopped.
    Disconnected,
    /// A socket is being opened.
    Connecting,
    /// The socket is open but registration has not yet been
    /// acknowledged.
    Connected,
    /// Registration was acknowledged; the outbound queue may drain.
    Registered,
    /// The last connection attempt (or registration) failed; a
    /// reconnect is pending (or, after a rejection, will never be
    /// retried automatically).
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Registered => "registered",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
