// State of the console link, owned by the command channel and observed
// through a watch channel by everything that cares.

/// Lifecycle of the single console socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    pub fn is_ready(self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        }
    }
}
