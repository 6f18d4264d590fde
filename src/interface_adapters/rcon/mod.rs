// Remote console adapter: wire frames, the multiplexing channel and the
// typed command facade on top of it.

pub mod channel;
pub mod commands;
pub mod protocol;

pub use channel::{ChannelSettings, RconChannel};
pub use commands::{RconCommands, ServerInfo};
