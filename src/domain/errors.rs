// Domain-level errors for the console link and the commands issued over it.

use std::fmt;

/// Failures of the console transport itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The live link is disabled by configuration.
    Disabled,
    /// Dial or handshake failed within the connect timeout.
    Handshake(String),
    /// The channel is not connected and reconnection did not succeed.
    NotConnected,
    /// The socket closed while the request was in flight.
    Closed,
    /// No reply arrived within the per-command timeout.
    Timeout,
    /// The socket rejected a write.
    Transport(String),
}

impl ChannelError {
    /// Transport faults recover on the next use; a disabled link does not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ChannelError::Disabled)
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Disabled => write!(f, "console link disabled"),
            ChannelError::Handshake(detail) => write!(f, "console handshake failed: {detail}"),
            ChannelError::NotConnected => write!(f, "console not connected"),
            ChannelError::Closed => write!(f, "console connection closed"),
            ChannelError::Timeout => write!(f, "console command timed out"),
            ChannelError::Transport(detail) => write!(f, "console transport error: {detail}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Failures scoped to a single typed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The underlying channel failed before a reply could arrive.
    Channel(ChannelError),
    /// The reply arrived but its payload did not match the expected shape.
    Decode { command: String, detail: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Channel(err) => write!(f, "{err}"),
            CommandError::Decode { command, detail } => {
                write!(f, "undecodable reply to `{command}`: {detail}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ChannelError> for CommandError {
    fn from(err: ChannelError) -> Self {
        CommandError::Channel(err)
    }
}
