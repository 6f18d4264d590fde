use std::{env, str::FromStr, time::Duration};
use url::Url;

use crate::domain::heat::PointOfInterest;
use crate::domain::telemetry::ActivityWindows;

// Runtime/server settings. Everything reads from the environment with a
// working default, so a bare `cargo run` starts a degraded but live service.

pub fn http_port() -> u16 {
    parsed("TELEMETRY_SERVER_PORT", 3005)
}

pub fn rcon_enabled() -> bool {
    env::var("RCON_ENABLED")
        .ok()
        .as_deref()
        .and_then(parse_bool)
        .unwrap_or(true)
}

pub fn rcon_host() -> String {
    env::var("RCON_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

pub fn rcon_port() -> u16 {
    parsed("RCON_PORT", 28016)
}

pub fn rcon_secret() -> String {
    env::var("RCON_SECRET").unwrap_or_default()
}

/// The console speaks WebSocket with the shared secret as the path.
pub fn rcon_endpoint(host: &str, port: u16, secret: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("ws://{host}:{port}/{secret}"))
}

pub fn rcon_connect_timeout() -> Duration {
    Duration::from_millis(parsed("RCON_CONNECT_TIMEOUT_MS", 5_000))
}

pub fn rcon_command_timeout() -> Duration {
    Duration::from_millis(parsed("RCON_COMMAND_TIMEOUT_MS", 4_000))
}

pub fn rcon_max_connect_attempts() -> u32 {
    parsed("RCON_MAX_CONNECT_ATTEMPTS", 5)
}

pub fn rcon_reconnect_base() -> Duration {
    Duration::from_millis(parsed("RCON_RECONNECT_BASE_MS", 500))
}

pub fn event_poll_interval() -> Duration {
    Duration::from_secs(parsed("EVENT_POLL_INTERVAL_SECS", 15))
}

pub fn player_poll_interval() -> Duration {
    Duration::from_secs(parsed("PLAYER_POLL_INTERVAL_SECS", 30))
}

pub fn recent_player_window() -> Duration {
    Duration::from_secs(parsed("RECENT_PLAYER_WINDOW_SECS", 900))
}

pub fn activity_windows() -> ActivityWindows {
    ActivityWindows {
        airdrop: Duration::from_secs(parsed("AIRDROP_WINDOW_SECS", 900)),
        helicopter: Duration::from_secs(parsed("HELICOPTER_WINDOW_SECS", 600)),
        cargo: Duration::from_secs(parsed("CARGO_WINDOW_SECS", 1_800)),
        raid: Duration::from_secs(parsed("RAID_WINDOW_SECS", 600)),
    }
}

pub fn event_ring_capacity() -> usize {
    parsed("EVENT_RING_CAPACITY", 50)
}

pub fn world_size() -> f32 {
    parsed("WORLD_SIZE", 4_000.0)
}

/// Unset or empty means no site integration; the in-memory store takes over.
pub fn site_api_url() -> Option<String> {
    env::var("SITE_API_URL").ok().filter(|url| !url.trim().is_empty())
}

pub fn site_api_timeout() -> Duration {
    Duration::from_millis(parsed("SITE_API_TIMEOUT_MS", 1_500))
}

pub const FEED_POLL_DEPTH: usize = 64;
pub const EVENT_BROADCAST_CAPACITY: usize = 256;

/// Fixed landmark set contributing baseline heat regardless of activity.
pub fn default_points_of_interest() -> Vec<PointOfInterest> {
    [
        ("Launch Site", 1_200.0, -800.0, 1.5),
        ("Airfield", -900.0, 1_100.0, 1.2),
        ("Harbor", -1_400.0, -1_300.0, 1.0),
        ("Outpost", 400.0, 1_500.0, 1.0),
        ("Oil Rig", 1_800.0, 1_700.0, 0.8),
    ]
    .into_iter()
    .map(|(name, x, y, weight)| PointOfInterest {
        name: name.to_string(),
        x,
        y,
        weight,
    })
    .collect()
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
