// Ports injected into the application workflows.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::console::ConsoleLine;
use crate::domain::errors::CommandError;
use crate::domain::players::{PlayerSighting, PlayerSnapshot};

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_seconds(&self) -> u64;
}

/// Wall-clock implementation used outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

// Port for the read side of the remote console, implemented by the command
// facade. Keeps the workflows free of wire-level concerns.
#[async_trait]
pub trait ConsoleAccess: Send + Sync {
    async fn online_players(&self) -> Result<Vec<PlayerSnapshot>, CommandError>;
    async fn console_backlog(&self, depth: usize) -> Result<Vec<ConsoleLine>, CommandError>;
}

// Port for the community site's player-activity persistence.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record_seen(&self, sightings: &[PlayerSighting]) -> Result<(), String>;
    async fn recent_players(
        &self,
        since_epoch_seconds: u64,
    ) -> Result<Vec<PlayerSighting>, String>;
}
