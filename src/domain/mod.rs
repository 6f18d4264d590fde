// Domain layer: telemetry types and pure rules.

pub mod console;
pub mod errors;
pub mod events;
pub mod heat;
pub mod link;
pub mod players;
pub mod ports;
pub mod ring;
pub mod telemetry;

pub use console::ConsoleLine;
pub use errors::{ChannelError, CommandError};
pub use events::{EventKind, GameEvent, PlayerRef, WorldPosition};
pub use link::ConnectionState;
pub use players::{OnlinePlayers, PlayerSighting, PlayerSnapshot, Provenance};
pub use telemetry::{ActivityWindows, TelemetrySnapshot, TelemetryState};
