// Activity store implementations: a reqwest client for the community site's
// internal player-activity endpoints, and an in-memory store for site-less
// runs and tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::players::PlayerSighting;
use crate::domain::ports::ActivityStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SightingDto {
    id: String,
    display_name: String,
    last_seen_epoch_seconds: u64,
}

impl From<&PlayerSighting> for SightingDto {
    fn from(sighting: &PlayerSighting) -> Self {
        Self {
            id: sighting.id.clone(),
            display_name: sighting.display_name.clone(),
            last_seen_epoch_seconds: sighting.last_seen_epoch_seconds,
        }
    }
}

impl From<SightingDto> for PlayerSighting {
    fn from(dto: SightingDto) -> Self {
        Self {
            id: dto.id,
            display_name: dto.display_name,
            last_seen_epoch_seconds: dto.last_seen_epoch_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
struct SeenRequest {
    players: Vec<SightingDto>,
}

#[derive(Debug, Deserialize)]
struct RecentResponse {
    players: Vec<SightingDto>,
}

// Thin reqwest client for the site's internal activity endpoints.
#[derive(Clone)]
pub struct SiteActivityClient {
    http: reqwest::Client,
    base_url: String,
}

impl SiteActivityClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ActivityStore for SiteActivityClient {
    async fn record_seen(&self, sightings: &[PlayerSighting]) -> Result<(), String> {
        let url = format!("{}/internal/players/seen", self.base_url);
        let body = SeenRequest {
            players: sightings.iter().map(SightingDto::from).collect(),
        };
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| format!("activity transport error: {err}"))?;

        if !response.status().is_success() {
            return Err(format!("activity upstream error {}", response.status()));
        }
        Ok(())
    }

    async fn recent_players(
        &self,
        since_epoch_seconds: u64,
    ) -> Result<Vec<PlayerSighting>, String> {
        let url = format!(
            "{}/internal/players/recent?since={since_epoch_seconds}",
            self.base_url
        );
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| format!("activity transport error: {err}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            // The site may not expose activity endpoints yet; treat as empty.
            debug!("activity endpoint missing; treating as empty");
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(format!("activity upstream error {}", response.status()));
        }

        let payload: RecentResponse = response
            .json()
            .await
            .map_err(|err| format!("activity response decode error: {err}"))?;
        Ok(payload.players.into_iter().map(PlayerSighting::from).collect())
    }
}

// In-memory activity store keyed by player id, keeping the freshest sighting.
pub struct MemoryActivityStore {
    entries: Mutex<HashMap<String, PlayerSighting>>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn record_seen(&self, sightings: &[PlayerSighting]) -> Result<(), String> {
        let mut guard = self.entries.lock().await;
        for sighting in sightings {
            let entry = guard
                .entry(sighting.id.clone())
                .or_insert_with(|| sighting.clone());
            if sighting.last_seen_epoch_seconds >= entry.last_seen_epoch_seconds {
                *entry = sighting.clone();
            }
        }
        Ok(())
    }

    async fn recent_players(
        &self,
        since_epoch_seconds: u64,
    ) -> Result<Vec<PlayerSighting>, String> {
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
