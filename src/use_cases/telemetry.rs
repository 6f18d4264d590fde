// Telemetry aggregation: a single owner task folds the event stream and
// periodic player polls into one state value, published atomically through a
// watch channel. Readers copy out and derive windowed views against their
// own "now"; nothing ever blocks on a stalled input.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::console::ConsoleLine;
use crate::domain::events::GameEvent;
use crate::domain::heat::{HeatPoint, MapBounds, PointOfInterest, generate};
use crate::domain::link::ConnectionState;
use crate::domain::players::OnlinePlayers;
use crate::domain::ports::{Clock, ConsoleAccess};
use crate::domain::ring::EventRing;
use crate::domain::telemetry::{ActivityWindows, TelemetrySnapshot, TelemetryState};
use crate::use_cases::feed::{FeedSettings, feed_task};
use crate::use_cases::players::OnlinePlayersResolver;

/// The one value the aggregator owns; replaced wholesale, never mutated
/// through the watch.
#[derive(Debug, Clone, Default)]
pub struct AggregatedState {
    pub players: OnlinePlayers,
    /// Ring copy, oldest first.
    pub events: Vec<GameEvent>,
    pub activity: TelemetryState,
}

pub async fn aggregator_task(
    resolver: Arc<OnlinePlayersResolver>,
    mut events_rx: broadcast::Receiver<GameEvent>,
    state_tx: watch::Sender<AggregatedState>,
    ring_capacity: usize,
    player_poll_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut ring = EventRing::new(ring_capacity);
    let mut activity = TelemetryState::default();
    let mut players = OnlinePlayers::default();
    let mut interval = tokio::time::interval(player_poll_interval);

    info!("telemetry aggregator started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,

            event = events_rx.recv() => {
                match event {
                    Ok(event) => {
                        activity.apply_event(&event);
                        ring.push(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event stream lagged; counters may undercount");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("event stream closed; aggregator exiting");
                        break;
                    }
                }
            }

            // First tick fires immediately, so a roster exists right away.
            _ = interval.tick() => {
                players = resolver.resolve().await;
                activity.apply_players(&players);
            }
        }

        let _ = state_tx.send(AggregatedState {
            players: players.clone(),
            events: ring.to_vec(),
            activity: activity.clone(),
        });
    }

    info!("telemetry aggregator stopped");
}

/// Cloneable read handle; every accessor copies out, no internal references
/// escape.
#[derive(Clone)]
pub struct TelemetryHandle {
    state_rx: watch::Receiver<AggregatedState>,
    events_tx: broadcast::Sender<GameEvent>,
    link_rx: watch::Receiver<ConnectionState>,
    windows: ActivityWindows,
    clock: Arc<dyn Clock>,
    points_of_interest: Arc<Vec<PointOfInterest>>,
    bounds: MapBounds,
}

impl TelemetryHandle {
    pub fn players(&self) -> OnlinePlayers {
        self.state_rx.borrow().players.clone()
    }

    /// Recent events, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<GameEvent> {
        let state = self.state_rx.borrow();
        state.events.iter().rev().take(limit).cloned().collect()
    }

    /// Windowed snapshot computed against the clock at call time.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        let now = self.clock.now_epoch_seconds();
        self.state_rx.borrow().activity.snapshot(now, &self.windows)
    }

    pub fn heat(&self) -> Vec<HeatPoint> {
        let state = self.state_rx.borrow();
        generate(
            &state.players.players,
            &state.events,
            &self.points_of_interest,
            self.bounds,
        )
    }

    pub fn link_state(&self) -> ConnectionState {
        *self.link_rx.borrow()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events_tx.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AggregatedState> {
        self.state_rx.clone()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub feed: FeedSettings,
    pub player_poll_interval: Duration,
    pub ring_capacity: usize,
    pub windows: ActivityWindows,
    pub points_of_interest: Vec<PointOfInterest>,
    pub bounds: MapBounds,
    pub event_broadcast_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            player_poll_interval: Duration::from_secs(30),
            ring_capacity: 50,
            windows: ActivityWindows::default(),
            points_of_interest: Vec::new(),
            bounds: MapBounds::new(4000.0),
            event_broadcast_capacity: 256,
        }
    }
}

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Owns the feed and aggregator tasks. Explicitly injectable: multiple
/// pipelines can coexist in one process, and each stops on `shutdown`.
pub struct TelemetryPipeline {
    handle: TelemetryHandle,
    shutdown: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl TelemetryPipeline {
    pub fn spawn(
        settings: PipelineSettings,
        console: Arc<dyn ConsoleAccess>,
        notices_rx: broadcast::Receiver<ConsoleLine>,
        link_rx: watch::Receiver<ConnectionState>,
        resolver: Arc<OnlinePlayersResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events_tx, events_rx) = broadcast::channel(settings.event_broadcast_capacity);
        let (state_tx, state_rx) = watch::channel(AggregatedState::default());
        let shutdown = Arc::new(Notify::new());

        let feed = tokio::spawn(feed_task(
            console,
            notices_rx,
            link_rx.clone(),
            events_tx.clone(),
            settings.feed.clone(),
            shutdown.clone(),
        ));
        let aggregator = tokio::spawn(aggregator_task(
            resolver,
            events_rx,
            state_tx,
            settings.ring_capacity,
            settings.player_poll_interval,
            shutdown.clone(),
        ));

        let handle = TelemetryHandle {
            state_rx,
            events_tx,
            link_rx,
            windows: settings.windows,
            clock,
            points_of_interest: Arc::new(settings.points_of_interest),
            bounds: settings.bounds,
        };

        Self {
            handle,
            shutdown,
            tasks: vec![feed, aggregator],
        }
    }

    pub fn handle(&self) -> TelemetryHandle {
        self.handle.clone()
    }

    /// Stops both tasks; aborts any that miss the grace period.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_waiters();
        for task in std::mem::take(&mut self.tasks) {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                abort.abort();
            }
        }
        info!("telemetry pipeline stopped");
    }
}

// Dropping without `shutdown` still stops the tasks, just without the grace
// period.
impl Drop for TelemetryPipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
