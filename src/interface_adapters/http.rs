// Consumer-facing HTTP API. Reads always answer with something (live,
// degraded or simulated, tagged with provenance). Admin mutations surface
// failures loudly; there is no safe fallback for "ban this player".

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::errors::{ChannelError, CommandError};
use crate::domain::events::GameEvent;
use crate::domain::heat::HeatPoint;
use crate::domain::link::ConnectionState;
use crate::domain::players::{OnlinePlayers, Provenance};
use crate::domain::telemetry::TelemetrySnapshot;
use crate::interface_adapters::state::AppState;

// Shared HTTP response types for consistent API error payloads.

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub display_name: String,
    pub ping: u32,
    pub connected_seconds: u64,
    pub health: f32,
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub provenance: Provenance,
    pub fetched_at_epoch_seconds: u64,
    pub players: Vec<PlayerDto>,
}

impl From<OnlinePlayers> for PlayersResponse {
    fn from(roster: OnlinePlayers) -> Self {
        Self {
            provenance: roster.provenance,
            fetched_at_epoch_seconds: roster.fetched_at_epoch_seconds,
            players: roster
                .players
                .into_iter()
                .map(|player| PlayerDto {
                    id: player.id,
                    display_name: player.display_name,
                    ping: player.ping,
                    connected_seconds: player.connected_seconds,
                    health: player.health,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationDto {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct ParticipantDto {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct GameEventDto {
    pub id: u64,
    pub kind: &'static str,
    pub at_epoch_seconds: u64,
    pub location: Option<LocationDto>,
    pub participants: Vec<ParticipantDto>,
    pub detail: String,
}

impl From<GameEvent> for GameEventDto {
    fn from(event: GameEvent) -> Self {
        Self {
            id: event.id,
            kind: event.kind.as_str(),
            at_epoch_seconds: event.at_epoch_seconds,
            location: event
                .location
                .map(|location| LocationDto {
                    x: location.x,
                    y: location.y,
                }),
            participants: event
                .participants
                .into_iter()
                .map(|participant| ParticipantDto {
                    id: participant.id,
                    display_name: participant.display_name,
                })
                .collect(),
            detail: event.detail,
        }
    }
}

/// Telemetry snapshot plus the console link state, so consumers can tell a
/// quiet server from a severed link.
#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    pub link: &'static str,
    #[serde(flatten)]
    pub snapshot: TelemetrySnapshot,
}

impl TelemetryResponse {
    pub fn new(snapshot: TelemetrySnapshot, link: ConnectionState) -> Self {
        Self {
            link: link.as_str(),
            snapshot,
        }
    }
}

pub async fn players_handler(State(state): State<Arc<AppState>>) -> Json<PlayersResponse> {
    Json(PlayersResponse::from(state.telemetry.players()))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    limit: Option<usize>,
}

const DEFAULT_EVENTS_LIMIT: usize = 50;

pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<GameEventDto>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENTS_LIMIT);
    Json(
        state
            .telemetry
            .recent_events(limit)
            .into_iter()
            .map(GameEventDto::from)
            .collect(),
    )
}

pub async fn telemetry_handler(State(state): State<Arc<AppState>>) -> Json<TelemetryResponse> {
    Json(TelemetryResponse::new(
        state.telemetry.telemetry(),
        state.telemetry.link_state(),
    ))
}

pub async fn heat_handler(State(state): State<Arc<AppState>>) -> Json<Vec<HeatPoint>> {
    Json(state.telemetry.heat())
}

#[derive(Debug, Deserialize)]
pub struct PlayerActionRequest {
    pub player_id: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayerIdRequest {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantItemRequest {
    pub player_id: String,
    pub item: String,
    pub amount: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawCommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct CommandReply {
    pub reply: String,
}

pub async fn kick_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayerActionRequest>,
) -> Response {
    if let Err(response) = require_non_empty("player_id", &request.player_id) {
        return response;
    }
    info!(player_id = %request.player_id, "admin kick");
    command_response(state.commands.kick(&request.player_id, &request.reason).await)
}

pub async fn ban_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayerActionRequest>,
) -> Response {
    if let Err(response) = require_non_empty("player_id", &request.player_id) {
        return response;
    }
    info!(player_id = %request.player_id, "admin ban");
    command_response(state.commands.ban(&request.player_id, &request.reason).await)
}

pub async fn unban_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayerIdRequest>,
) -> Response {
    if let Err(response) = require_non_empty("player_id", &request.player_id) {
        return response;
    }
    info!(player_id = %request.player_id, "admin unban");
    command_response(state.commands.unban(&request.player_id).await)
}

pub async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    if let Err(response) = require_non_empty("message", &request.message) {
        return response;
    }
    command_response(state.commands.broadcast(&request.message).await)
}

pub async fn give_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GrantItemRequest>,
) -> Response {
    if let Err(response) = require_non_empty("player_id", &request.player_id) {
        return response;
    }
    if let Err(response) = require_non_empty("item", &request.item) {
        return response;
    }
    if request.amount == 0 {
        return validation_error("amount must be positive");
    }
    info!(player_id = %request.player_id, item = %request.item, amount = request.amount, "admin grant");
    command_response(
        state
            .commands
            .grant_item(&request.player_id, &request.item, request.amount)
            .await,
    )
}

pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RawCommandRequest>,
) -> Response {
    if let Err(response) = require_non_empty("command", &request.command) {
        return response;
    }
    info!(command = %request.command, "admin raw command");
    command_response(state.commands.execute_raw(&request.command).await)
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), Response> {
    if value.trim().is_empty() {
        return Err(validation_error(&format!("{field} is required")));
    }
    Ok(())
}

fn validation_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn command_response(result: Result<String, CommandError>) -> Response {
    match result {
        Ok(reply) => (StatusCode::OK, Json(CommandReply { reply })).into_response(),
        Err(err) => {
            let status = match &err {
                CommandError::Channel(ChannelError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
                CommandError::Channel(_) => StatusCode::BAD_GATEWAY,
                CommandError::Decode { .. } => StatusCode::BAD_GATEWAY,
            };
            warn!(error = %err, "admin command failed");
            (
                status,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
