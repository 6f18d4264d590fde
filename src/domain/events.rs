// Domain-level game event types shared by the feed, the aggregator and the heat model.

/// Map coordinates in world units, centered on the map origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
}

/// A player mentioned by an event. Identity is the opaque id; names are not stable.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRef {
    pub id: String,
    pub display_name: String,
}

/// What happened on the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Kill,
    Death,
    Raid,
    Airdrop,
    Helicopter,
    Cargo,
    Build,
    Destroy,
    Join,
    Leave,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Kill => "kill",
            EventKind::Death => "death",
            EventKind::Raid => "raid",
            EventKind::Airdrop => "airdrop",
            EventKind::Helicopter => "helicopter",
            EventKind::Cargo => "cargo",
            EventKind::Build => "build",
            EventKind::Destroy => "destroy",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
        }
    }
}

/// Immutable record of something observed on the game server.
///
/// For kills the participant order is victim first, attacker second.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub id: u64,
    pub kind: EventKind,
    pub at_epoch_seconds: u64,
    pub location: Option<WorldPosition>,
    pub participants: Vec<PlayerRef>,
    pub detail: String,
}

impl GameEvent {
    pub fn new(id: u64, kind: EventKind, at_epoch_seconds: u64, detail: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            at_epoch_seconds,
            location: None,
            participants: Vec::new(),
            detail: detail.into(),
        }
    }

    pub fn with_location(mut self, location: WorldPosition) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_participants(mut self, participants: Vec<PlayerRef>) -> Self {
        self.participants = participants;
        self
    }
}
