// Player roster types and the provenance tag every roster carries.

use serde::Serialize;
use std::collections::BTreeMap;

/// Where a roster came from. Consumers must never mistake synthetic data
/// for fact, so the tag travels with the data everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Recent,
    Simulated,
    #[default]
    None,
}

/// One player as reported by the live console. Ephemeral; identity is the
/// opaque id, display names are neither unique nor stable.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: String,
    pub display_name: String,
    pub ping: u32,
    pub connected_seconds: u64,
    pub health: f32,
}

/// Last-seen record exchanged with the activity store.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSighting {
    pub id: String,
    pub display_name: String,
    pub last_seen_epoch_seconds: u64,
}

/// A roster plus how it was obtained and when.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlinePlayers {
    pub players: Vec<PlayerSnapshot>,
    pub provenance: Provenance,
    pub fetched_at_epoch_seconds: u64,
}

impl OnlinePlayers {
    /// Explicit "all sources exhausted" result, distinct from empty-but-valid.
    pub fn unavailable(now_epoch_seconds: u64) -> Self {
        Self {
            players: Vec::new(),
            provenance: Provenance::None,
            fetched_at_epoch_seconds: now_epoch_seconds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

const UNAFFILIATED: &str = "unaffiliated";

/// Clan tag embedded in the display name (`[TAG] Name`), if any.
pub fn faction_of(display_name: &str) -> Option<&str> {
    let rest = display_name.trim_start().strip_prefix('[')?;
    let (tag, _) = rest.split_once(']')?;
    let tag = tag.trim();
    if tag.is_empty() { None } else { Some(tag) }
}

/// Roster breakdown by clan tag; players without one count as unaffiliated.
pub fn counts_by_faction(players: &[PlayerSnapshot]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for player in players {
        let faction = faction_of(&player.display_name).unwrap_or(UNAFFILIATED);
        *counts.entry(faction.to_string()).or_insert(0) += 1;
    }
    counts
}
