// Event stream fan-in: one ordered stream of game events regardless of
// transport. Push (out-of-band console notices) is primary; polling the
// console backlog takes over whenever the link is not ready, and never both
// at once.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, watch};
use tracing::{debug, info, warn};

use crate::domain::console::{ConsoleLine, event_from_line};
use crate::domain::events::GameEvent;
use crate::domain::link::ConnectionState;
use crate::domain::ports::ConsoleAccess;

#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Cadence of the backlog poll while the push path is down.
    pub poll_interval: Duration,
    /// Lines fetched per poll; bounds worst-case gap recovery.
    pub poll_depth: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            poll_depth: 64,
        }
    }
}

/// Which transport currently feeds the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Pushing,
    Polling,
}

/// The single transition rule: push while the link is ready, poll otherwise.
pub fn mode_for_link(link: ConnectionState) -> FeedMode {
    if link.is_ready() {
        FeedMode::Pushing
    } else {
        FeedMode::Polling
    }
}

/// Long-lived fan-in task. Suspends on the push stream, the poll tick and the
/// link watch; stops cleanly on shutdown from any suspension point.
pub async fn feed_task(
    console: Arc<dyn ConsoleAccess>,
    mut notices_rx: broadcast::Receiver<ConsoleLine>,
    mut link_rx: watch::Receiver<ConnectionState>,
    events_tx: broadcast::Sender<GameEvent>,
    settings: FeedSettings,
    shutdown: Arc<Notify>,
) {
    let mut mode = mode_for_link(*link_rx.borrow());
    // Monotonic time cursor over the console backlog; makes poll re-reads
    // idempotent and stops the poll path replaying pushed lines.
    let mut cursor: u64 = 0;
    let mut next_event_id: u64 = 1;
    let mut interval = tokio::time::interval(settings.poll_interval);

    info!(mode = ?mode, "event feed started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,

            changed = link_rx.changed() => {
                if changed.is_err() {
                    warn!("link state channel closed; event feed exiting");
                    break;
                }
                let next = mode_for_link(*link_rx.borrow());
                if next != mode {
                    info!(from = ?mode, to = ?next, "event feed transport change");
                    mode = next;
                }
            }

            notice = notices_rx.recv() => {
                match notice {
                    Ok(line) => {
                        if mode == FeedMode::Pushing {
                            emit_line(&line, &events_tx, &mut cursor, &mut next_event_id);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "console notices lagged; backlog poll will recover");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("console notices channel closed; event feed exiting");
                        break;
                    }
                }
            }

            _ = interval.tick() => {
                if mode != FeedMode::Polling {
                    continue;
                }
                match console.console_backlog(settings.poll_depth).await {
                    Ok(lines) => {
                        for line in lines {
                            if line.at_epoch_seconds > cursor {
                                emit_line(&line, &events_tx, &mut cursor, &mut next_event_id);
                            }
                        }
                    }
                    Err(err) => {
                        // The failed send already nudged a reconnect attempt.
                        debug!(error = %err, "console backlog poll failed");
                    }
                }
            }
        }
    }

    info!("event feed stopped");
}

fn emit_line(
    line: &ConsoleLine,
    events_tx: &broadcast::Sender<GameEvent>,
    cursor: &mut u64,
    next_event_id: &mut u64,
) {
    *cursor = (*cursor).max(line.at_epoch_seconds);
    if let Some(event) = event_from_line(line, *next_event_id) {
        *next_event_id += 1;
        // No receivers is fine; the aggregator may not have started yet.
        let _ = events_tx.send(event);
    }
}
