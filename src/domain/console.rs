// Console output lines and the grammar that turns them into game events.
//
// The remote console emits free-form text. Only a handful of line shapes carry
// telemetry value: entity spawn announcements, kill/death reports, connection
// churn, and the bracket-tagged alerts raid/build plugins print. Everything
// else is skipped, never an error.

use crate::domain::events::{EventKind, GameEvent, PlayerRef, WorldPosition};

/// One line of console output with its epoch-seconds timestamp.
///
/// Lines arriving over the push path are stamped on receipt; lines fetched
/// from the console backlog carry the server's own timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub at_epoch_seconds: u64,
    pub text: String,
}

impl ConsoleLine {
    pub fn new(at_epoch_seconds: u64, text: impl Into<String>) -> Self {
        Self {
            at_epoch_seconds,
            text: text.into(),
        }
    }
}

/// Parses one console line into a game event, or `None` for lines with no
/// telemetry value.
pub fn event_from_line(line: &ConsoleLine, id: u64) -> Option<GameEvent> {
    let text = line.text.trim();
    if text.is_empty() {
        return None;
    }
    let at = line.at_epoch_seconds;

    if let Some(prefab) = text.strip_prefix("[event] ") {
        return spawn_event(prefab, id, at);
    }
    if let Some(event) = tagged_event(text, id, at) {
        return Some(event);
    }
    if text.contains(" was killed by ") {
        return kill_event(text, id, at);
    }
    if text.contains(" was suicide") || text.contains(" died (") {
        return death_event(text, id, at);
    }
    if text.contains(" joined [") {
        return join_event(text, id, at);
    }
    if text.contains(" disconnecting: ") {
        return leave_event(text, id, at);
    }
    None
}

// Entity spawn announcements name the prefab that entered the world.
fn spawn_event(prefab: &str, id: u64, at: u64) -> Option<GameEvent> {
    let lowered = prefab.to_ascii_lowercase();
    let kind = if lowered.contains("patrolhelicopter") || lowered.contains("ch47") {
        EventKind::Helicopter
    } else if lowered.contains("cargo_plane") || lowered.contains("supply_drop") {
        EventKind::Airdrop
    } else if lowered.contains("cargoship") {
        EventKind::Cargo
    } else {
        return None;
    };
    Some(GameEvent::new(id, kind, at, prefab.trim()))
}

// Bracket-tagged plugin alerts, optionally naming the acting player and a
// trailing map position.
fn tagged_event(text: &str, id: u64, at: u64) -> Option<GameEvent> {
    let (kind, rest) = if let Some(rest) = text.strip_prefix("[raid] ") {
        (EventKind::Raid, rest)
    } else if let Some(rest) = text.strip_prefix("[build] ") {
        (EventKind::Build, rest)
    } else if let Some(rest) = text.strip_prefix("[destroy] ") {
        (EventKind::Destroy, rest)
    } else {
        return None;
    };

    let (detail, location) = split_trailing_position(rest);
    let mut event = GameEvent::new(id, kind, at, detail);
    if let Some(actor) = leading_player_ref(detail) {
        event = event.with_participants(vec![actor]);
    }
    if let Some(location) = location {
        event = event.with_location(location);
    }
    Some(event)
}

fn kill_event(text: &str, id: u64, at: u64) -> Option<GameEvent> {
    let (body, location) = split_trailing_position(text);
    let (victim_part, attacker_part) = body.split_once(" was killed by ")?;
    let victim = parse_player_ref(victim_part)?;

    let mut participants = vec![victim];
    // NPC and trap kills name an attacker without a player id; keep the victim alone then.
    if let Some(attacker) = parse_player_ref(attacker_part) {
        participants.push(attacker);
    }

    let mut event = GameEvent::new(id, EventKind::Kill, at, body).with_participants(participants);
    if let Some(location) = location {
        event = event.with_location(location);
    }
    Some(event)
}

fn death_event(text: &str, id: u64, at: u64) -> Option<GameEvent> {
    let (body, location) = split_trailing_position(text);
    let victim_part = if let Some((victim, _)) = body.split_once(" was suicide") {
        victim
    } else {
        body.split_once(" died (")?.0
    };
    let victim = parse_player_ref(victim_part)?;

    let mut event =
        GameEvent::new(id, EventKind::Death, at, body).with_participants(vec![victim]);
    if let Some(location) = location {
        event = event.with_location(location);
    }
    Some(event)
}

// `Name joined [os/id]`
fn join_event(text: &str, id: u64, at: u64) -> Option<GameEvent> {
    let (name, rest) = text.split_once(" joined [")?;
    let inner = rest.strip_suffix(']')?;
    let (_, player_id) = inner.rsplit_once('/')?;
    if !is_numeric_id(player_id) {
        return None;
    }
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(
        GameEvent::new(id, EventKind::Join, at, text).with_participants(vec![PlayerRef {
            id: player_id.to_string(),
            display_name: name.to_string(),
        }]),
    )
}

// `addr/id/Name disconnecting: reason`
fn leave_event(text: &str, id: u64, at: u64) -> Option<GameEvent> {
    let (prefix, reason) = text.split_once(" disconnecting: ")?;
    let mut parts = prefix.rsplitn(3, '/');
    let name = parts.next()?.trim();
    let player_id = parts.next()?;
    if name.is_empty() || !is_numeric_id(player_id) {
        return None;
    }
    Some(
        GameEvent::new(id, EventKind::Leave, at, reason.trim()).with_participants(vec![
            PlayerRef {
                id: player_id.to_string(),
                display_name: name.to_string(),
            },
        ]),
    )
}

// Parses `Name[id]` where the id is all digits.
fn parse_player_ref(fragment: &str) -> Option<PlayerRef> {
    let fragment = fragment.trim();
    let open = fragment.rfind('[')?;
    let inner = fragment[open + 1..].strip_suffix(']')?;
    if !is_numeric_id(inner) {
        return None;
    }
    let name = fragment[..open].trim();
    if name.is_empty() {
        return None;
    }
    Some(PlayerRef {
        id: inner.to_string(),
        display_name: name.to_string(),
    })
}

// First `Name[id]` fragment at the start of an alert body, if any.
fn leading_player_ref(text: &str) -> Option<PlayerRef> {
    let end = text.find(']')?;
    parse_player_ref(&text[..=end])
}

// Splits a trailing ` at (x, y)` suffix off an alert body.
fn split_trailing_position(text: &str) -> (&str, Option<WorldPosition>) {
    let Some(start) = text.rfind(" at (") else {
        return (text, None);
    };
    let Some(inner) = text[start + 5..].strip_suffix(')') else {
        return (text, None);
    };
    let Some((x, y)) = inner.split_once(',') else {
        return (text, None);
    };
    let (Ok(x), Ok(y)) = (x.trim().parse::<f32>(), y.trim().parse::<f32>()) else {
        return (text, None);
    };
    (text[..start].trim_end(), Some(WorldPosition { x, y }))
}

fn is_numeric_id(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}
