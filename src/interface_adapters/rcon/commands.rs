// Typed command facade over the raw channel: encodes one request string per
// operation and decodes the reply payload, turning malformed payloads into
// typed decode errors instead of crashes. Mutations are single-shot; retry
// policy belongs to the caller because repeating a kick or grant has real
// side effects in the game world.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::console::ConsoleLine;
use crate::domain::errors::CommandError;
use crate::domain::players::PlayerSnapshot;
use crate::domain::ports::ConsoleAccess;

use super::channel::RconChannel;

/// `serverinfo` payload, trimmed to the fields the site consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "MaxPlayers")]
    pub max_players: u32,
    #[serde(rename = "Players")]
    pub players: u32,
    #[serde(rename = "Queued", default)]
    pub queued: u32,
    #[serde(rename = "Joining", default)]
    pub joining: u32,
    #[serde(rename = "Map", default)]
    pub map: String,
    #[serde(rename = "Framerate", default)]
    pub framerate: f32,
    #[serde(rename = "Uptime", default)]
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct PlayerEntry {
    #[serde(rename = "SteamID")]
    steam_id: String,
    #[serde(rename = "DisplayName")]
    display_name: String,
    #[serde(rename = "Ping", default)]
    ping: u32,
    #[serde(rename = "ConnectedSeconds", default)]
    connected_seconds: u64,
    #[serde(rename = "Health", default)]
    health: f32,
}

impl From<PlayerEntry> for PlayerSnapshot {
    fn from(entry: PlayerEntry) -> Self {
        Self {
            id: entry.steam_id,
            display_name: entry.display_name,
            ping: entry.ping,
            connected_seconds: entry.connected_seconds,
            health: entry.health,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ConsoleTailEntry {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Time", default)]
    time: u64,
}

/// Typed operations over one shared channel. Cheap to clone via `Arc`.
pub struct RconCommands {
    channel: Arc<RconChannel>,
    command_timeout: Duration,
}

impl RconCommands {
    pub fn new(channel: Arc<RconChannel>, command_timeout: Duration) -> Self {
        Self {
            channel,
            command_timeout,
        }
    }

    pub async fn server_info(&self) -> Result<ServerInfo, CommandError> {
        let reply = self.channel.send("serverinfo", self.command_timeout).await?;
        decode("serverinfo", &reply)
    }

    pub async fn players(&self) -> Result<Vec<PlayerSnapshot>, CommandError> {
        let reply = self.channel.send("playerlist", self.command_timeout).await?;
        let entries: Vec<PlayerEntry> = decode("playerlist", &reply)?;
        Ok(entries.into_iter().map(PlayerSnapshot::from).collect())
    }

    /// Derived by filtering the full roster; the console has no per-player
    /// lookup.
    pub async fn player_info(&self, id: &str) -> Result<Option<PlayerSnapshot>, CommandError> {
        let players = self.players().await?;
        Ok(players.into_iter().find(|player| player.id == id))
    }

    pub async fn kick(&self, id: &str, reason: &str) -> Result<String, CommandError> {
        self.execute_raw(&format!("kick {id} {}", quoted(reason))).await
    }

    pub async fn ban(&self, id: &str, reason: &str) -> Result<String, CommandError> {
        self.execute_raw(&format!("ban {id} {}", quoted(reason))).await
    }

    pub async fn unban(&self, id: &str) -> Result<String, CommandError> {
        self.execute_raw(&format!("unban {id}")).await
    }

    pub async fn broadcast(&self, message: &str) -> Result<String, CommandError> {
        self.execute_raw(&format!("say {}", quoted(message))).await
    }

    pub async fn grant_item(
        &self,
        id: &str,
        item: &str,
        amount: u32,
    ) -> Result<String, CommandError> {
        self.execute_raw(&format!("inventory.giveto {id} {item} {amount}"))
            .await
    }

    /// Pass-through for arbitrary console commands.
    pub async fn execute_raw(&self, command: &str) -> Result<String, CommandError> {
        Ok(self.channel.send(command, self.command_timeout).await?)
    }

    pub async fn console_tail(&self, depth: usize) -> Result<Vec<ConsoleLine>, CommandError> {
        let command = format!("console.tail {depth}");
        let reply = self.channel.send(&command, self.command_timeout).await?;
        let entries: Vec<ConsoleTailEntry> = decode(&command, &reply)?;
        Ok(entries
            .into_iter()
            .map(|entry| ConsoleLine::new(entry.time, entry.message))
            .collect())
    }
}

#[async_trait]
impl ConsoleAccess for RconCommands {
    async fn online_players(&self) -> Result<Vec<PlayerSnapshot>, CommandError> {
        self.players().await
    }

    async fn console_backlog(&self, depth: usize) -> Result<Vec<ConsoleLine>, CommandError> {
        self.console_tail(depth).await
    }
}

fn decode<T: DeserializeOwned>(command: &str, payload: &str) -> Result<T, CommandError> {
    serde_json::from_str(payload).map_err(|err| {
        // Enough context to diagnose protocol drift without dumping payloads.
        warn!(
            command,
            error = %err,
            bytes = payload.len(),
            excerpt = excerpt(payload),
            "reply payload did not match the expected shape"
        );
        CommandError::Decode {
            command: command.to_string(),
            detail: err.to_string(),
        }
    })
}

fn excerpt(payload: &str) -> &str {
    let mut end = payload.len().min(80);
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    &payload[..end]
}

fn quoted(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\\\""))
}
