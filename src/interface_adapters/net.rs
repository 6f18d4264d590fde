// Live push to consumers: `/live` upgrades to a WebSocket and forwards new
// game events and telemetry snapshots until the subscriber disconnects.
// Disconnect cancels the loop; no background work survives it.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::SinkExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::interface_adapters::http::{GameEventDto, TelemetryResponse};
use crate::interface_adapters::state::AppState;

/// Messages pushed to live subscribers.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum LiveMessage {
    Event(GameEventDto),
    Telemetry(TelemetryResponse),
}

pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_subscriber_loop(socket, state))
}

async fn run_subscriber_loop(mut socket: WebSocket, state: Arc<AppState>) {
    let mut events_rx = state.telemetry.subscribe_events();
    let mut state_rx = state.telemetry.subscribe_state();

    info!("live subscriber connected");

    // Seed the subscriber with the current picture before streaming deltas.
    if send_live(&mut socket, &telemetry_message(&state)).await.is_err() {
        return;
    }

    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => true,
                    Some(Ok(_)) => false,
                    Some(Err(err)) => {
                        debug!(error = %err, "live socket recv error");
                        true
                    }
                }
            }

            event = events_rx.recv() => {
                match event {
                    Ok(event) => send_live(&mut socket, &LiveMessage::Event(event.into()))
                        .await
                        .is_err(),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Resync strategy: skip the backlog, send the snapshot.
                        warn!(missed, "live subscriber lagged; resyncing from snapshot");
                        send_live(&mut socket, &telemetry_message(&state)).await.is_err()
                    }
                    Err(broadcast::error::RecvError::Closed) => true,
                }
            }

            changed = state_rx.changed() => {
                match changed {
                    Ok(()) => send_live(&mut socket, &telemetry_message(&state)).await.is_err(),
                    Err(_) => true,
                }
            }
        };

        if disconnect {
            break;
        }
    }

    let _ = socket.close().await;
    info!("live subscriber disconnected");
}

fn telemetry_message(state: &AppState) -> LiveMessage {
    LiveMessage::Telemetry(TelemetryResponse::new(
        state.telemetry.telemetry(),
        state.telemetry.link_state(),
    ))
}

async fn send_live(socket: &mut WebSocket, message: &LiveMessage) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(err) => {
            // Serialization failures are a bug, not a subscriber problem.
            warn!(error = %err, "failed to serialize live message");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}
