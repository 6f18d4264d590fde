// Decaying telemetry counters derived from the event stream and player polls.
//
// "Active" booleans are never stored: the state keeps last-occurrence
// timestamps and every read recomputes the flags against its own "now", so a
// snapshot taken after a window closes reports false with no new events.

use crate::domain::events::{EventKind, GameEvent};
use crate::domain::players::{OnlinePlayers, Provenance, counts_by_faction};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

// Raid timestamps kept for the decaying count; old entries fall out of the
// window long before this bound matters.
const RAID_TRACK_CAPACITY: usize = 64;

/// Decay windows for the time-windowed activity flags. Configuration, not
/// constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindows {
    pub airdrop: Duration,
    pub helicopter: Duration,
    pub cargo: Duration,
    pub raid: Duration,
}

impl Default for ActivityWindows {
    fn default() -> Self {
        Self {
            airdrop: Duration::from_secs(900),
            helicopter: Duration::from_secs(600),
            cargo: Duration::from_secs(1800),
            raid: Duration::from_secs(600),
        }
    }
}

/// Accumulated telemetry facts. Pure state machine: `apply_*` folds inputs
/// in, `snapshot` derives the windowed view without mutating anything.
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    pub player_count: usize,
    pub counts_by_faction: BTreeMap<String, usize>,
    pub provenance: Provenance,
    pub kill_count: u64,
    raid_times: VecDeque<u64>,
    last_airdrop_at: Option<u64>,
    last_helicopter_at: Option<u64>,
    last_cargo_at: Option<u64>,
    pub last_event_at: Option<u64>,
    pub players_refreshed_at: Option<u64>,
}

impl TelemetryState {
    pub fn apply_event(&mut self, event: &GameEvent) {
        self.last_event_at = Some(
            self.last_event_at
                .map_or(event.at_epoch_seconds, |at| at.max(event.at_epoch_seconds)),
        );

        match event.kind {
            EventKind::Kill => self.kill_count += 1,
            EventKind::Raid => {
                if self.raid_times.len() == RAID_TRACK_CAPACITY {
                    self.raid_times.pop_front();
                }
                self.raid_times.push_back(event.at_epoch_seconds);
            }
            EventKind::Airdrop => self.last_airdrop_at = latest(self.last_airdrop_at, event),
            EventKind::Helicopter => {
                self.last_helicopter_at = latest(self.last_helicopter_at, event)
            }
            EventKind::Cargo => self.last_cargo_at = latest(self.last_cargo_at, event),
            _ => {}
        }
    }

    pub fn apply_players(&mut self, players: &OnlinePlayers) {
        self.player_count = players.players.len();
        self.counts_by_faction = counts_by_faction(&players.players);
        self.provenance = players.provenance;
        self.players_refreshed_at = Some(players.fetched_at_epoch_seconds);
    }

    /// Windowed view relative to `now_epoch_seconds`.
    pub fn snapshot(&self, now_epoch_seconds: u64, windows: &ActivityWindows) -> TelemetrySnapshot {
        TelemetrySnapshot {
            player_count: self.player_count,
            counts_by_faction: self.counts_by_faction.clone(),
            provenance: self.provenance,
            kill_count: self.kill_count,
            active_raid_count: self
                .raid_times
                .iter()
                .filter(|at| within(now_epoch_seconds, **at, windows.raid))
                .count(),
            airdrop_active: flag(now_epoch_seconds, self.last_airdrop_at, windows.airdrop),
            helicopter_active: flag(now_epoch_seconds, self.last_helicopter_at, windows.helicopter),
            cargo_active: flag(now_epoch_seconds, self.last_cargo_at, windows.cargo),
            last_event_at: self.last_event_at,
            players_refreshed_at: self.players_refreshed_at,
        }
    }
}

fn latest(current: Option<u64>, event: &GameEvent) -> Option<u64> {
    Some(current.map_or(event.at_epoch_seconds, |at| at.max(event.at_epoch_seconds)))
}

fn within(now: u64, at: u64, window: Duration) -> bool {
    now.saturating_sub(at) < window.as_secs()
}

fn flag(now: u64, last_at: Option<u64>, window: Duration) -> bool {
    matches!(last_at, Some(at) if within(now, at, window))
}

/// Copy-out view handed to consumers; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub player_count: usize,
    pub counts_by_faction: BTreeMap<String, usize>,
    pub provenance: Provenance,
    pub kill_count: u64,
    pub active_raid_count: usize,
    pub airdrop_active: bool,
    pub helicopter_active: bool,
    pub cargo_active: bool,
    pub last_event_at: Option<u64>,
    pub players_refreshed_at: Option<u64>,
}
