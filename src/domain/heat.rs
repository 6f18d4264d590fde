// Heat map derivation: a pure function from the current picture to a
// weighted point set. No hidden state, identical inputs give identical output.

use crate::domain::events::{EventKind, GameEvent};
use crate::domain::players::PlayerSnapshot;
use serde::Serialize;

/// Square map extent in world units, centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub extent: f32,
}

impl MapBounds {
    pub fn new(extent: f32) -> Self {
        Self {
            extent: extent.max(1.0),
        }
    }

    fn half(self) -> f32 {
        self.extent / 2.0
    }
}

/// Static landmark that always contributes a baseline weight.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatCategory {
    Presence,
    Combat,
    Event,
    Landmark,
}

/// One weighted point for visualization consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPoint {
    pub x: f32,
    pub y: f32,
    pub intensity: f32,
    pub category: HeatCategory,
}

/// Derives the point set from players, recent events and static landmarks.
///
/// The console does not report live player coordinates, so presence points
/// are placed by hashing the stable player id into the map bounds; the
/// placement is arbitrary but identical between refreshes.
pub fn generate(
    players: &[PlayerSnapshot],
    events: &[GameEvent],
    points_of_interest: &[PointOfInterest],
    bounds: MapBounds,
) -> Vec<HeatPoint> {
    let mut points =
        Vec::with_capacity(players.len() + events.len() + points_of_interest.len());

    for player in players {
        let (x, y) = placement(&player.id, bounds);
        points.push(HeatPoint {
            x,
            y,
            intensity: 1.0,
            category: HeatCategory::Presence,
        });
    }

    for event in events {
        // Events without a reported location are skipped rather than guessed.
        let Some(location) = event.location else {
            continue;
        };
        points.push(HeatPoint {
            x: location.x,
            y: location.y,
            intensity: event_weight(event.kind),
            category: event_category(event.kind),
        });
    }

    for poi in points_of_interest {
        points.push(HeatPoint {
            x: poi.x,
            y: poi.y,
            intensity: poi.weight,
            category: HeatCategory::Landmark,
        });
    }

    points
}

/// Combat activity outweighs idle presence.
pub fn event_weight(kind: EventKind) -> f32 {
    match kind {
        EventKind::Raid => 4.0,
        EventKind::Kill => 3.0,
        EventKind::Destroy => 2.5,
        EventKind::Airdrop | EventKind::Helicopter | EventKind::Cargo => 2.0,
        EventKind::Death => 1.5,
        EventKind::Build => 1.0,
        EventKind::Join | EventKind::Leave => 0.5,
    }
}

fn event_category(kind: EventKind) -> HeatCategory {
    match kind {
        EventKind::Kill | EventKind::Death | EventKind::Raid | EventKind::Build
        | EventKind::Destroy => HeatCategory::Combat,
        EventKind::Airdrop | EventKind::Helicopter | EventKind::Cargo => HeatCategory::Event,
        EventKind::Join | EventKind::Leave => HeatCategory::Presence,
    }
}

// FNV-1a; cheap, stable across processes.
fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn placement(id: &str, bounds: MapBounds) -> (f32, f32) {
    let hash = fnv1a(id);
    let unit_x = (hash & 0xffff) as f32 / 65_535.0;
    let unit_y = ((hash >> 16) & 0xffff) as f32 / 65_535.0;
    (
        unit_x * bounds.extent - bounds.half(),
        unit_y * bounds.extent - bounds.half(),
    )
}
