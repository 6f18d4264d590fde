use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::console::ConsoleLine;
use crate::domain::errors::{ChannelError, CommandError};
use crate::domain::players::{PlayerSighting, PlayerSnapshot, Provenance};
use crate::domain::ports::{ActivityStore, Clock, ConsoleAccess};
use crate::use_cases::players::{PlayerSource, SourceResult};

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub record: bool,
    pub recent: bool,
}

// In-memory activity store that records upserts for assertions.
pub(crate) struct RecordingActivityStore {
    entries: Mutex<HashMap<String, PlayerSighting>>,
    failures: FailureFlags,
}

impl RecordingActivityStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            failures: FailureFlags::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) async fn seen(&self) -> Vec<PlayerSighting> {
        let guard = self.entries.lock().await;
        let mut sightings: Vec<PlayerSighting> = guard.values().cloned().collect();
        sightings.sort_by(|a, b| a.id.cmp(&b.id));
        sightings
    }
}

#[async_trait]
impl ActivityStore for RecordingActivityStore {
    async fn record_seen(&self, sightings: &[PlayerSighting]) -> Result<(), String> {
        if self.failures.record {
            return Err("record failed".to_string());
        }

        let mut guard = self.entries.lock().await;
        for sighting in sightings {
            guard.insert(sighting.id.clone(), sighting.clone());
        }
        Ok(())
    }

    async fn recent_players(
        &self,
        since_epoch_seconds: u64,
    ) -> Result<Vec<PlayerSighting>, String> {
        if self.failures.recent {
            return Err("recent failed".to_string());
        }

        let guard = self.entries.lock().await;
        let mut sightings: Vec<PlayerSighting> = guard
            .values()
            .filter(|sighting| sighting.last_seen_epoch_seconds >= since_epoch_seconds)
            .cloned()
            .collect();
        sightings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(sightings)
    }
}

// Player source fake with a fixed outcome and a call counter for
// short-circuit assertions.
pub(crate) struct ScriptedSource {
    provenance: Provenance,
    result: SourceResult,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new(provenance: Provenance, result: SourceResult) -> Self {
        Self {
            provenance,
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerSource for ScriptedSource {
    fn provenance(&self) -> Provenance {
        self.provenance
    }

    async fn fetch(&self) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

// Console fake for pipeline tests.
pub(crate) struct ScriptedConsoleAccess {
    players: Result<Vec<PlayerSnapshot>, CommandError>,
    backlog: Mutex<Vec<Vec<ConsoleLine>>>,
}

impl ScriptedConsoleAccess {
    /// Behaves like a console whose link never comes up.
    pub(crate) fn unreachable() -> Self {
        Self {
            players: Err(CommandError::Channel(ChannelError::NotConnected)),
            backlog: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_players(players: Vec<PlayerSnapshot>) -> Self {
        Self {
            players: Ok(players),
            backlog: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConsoleAccess for ScriptedConsoleAccess {
    async fn online_players(&self) -> Result<Vec<PlayerSnapshot>, CommandError> {
        self.players.clone()
    }

    async fn console_backlog(&self, _depth: usize) -> Result<Vec<ConsoleLine>, CommandError> {
        let mut guard = self.backlog.lock().await;
        if guard.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(guard.remove(0))
        }
    }
}
