// The command channel: at most one live socket to the game server's console,
// multiplexing concurrent command/response pairs over it. One connection task
// owns the socket; callers interact only through `send` futures and the
// identifier-keyed pending table.

use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::console::ConsoleLine;
use crate::domain::errors::ChannelError;
use crate::domain::link::ConnectionState;
use crate::domain::ports::Clock;

use super::protocol::{CommandFrame, ReplyFrame};

const WRITE_QUEUE_CAPACITY: usize = 64;
const NOTICE_BROADCAST_CAPACITY: usize = 256;
// Doubling stops here; further attempts reuse the capped delay.
const BACKOFF_DOUBLING_CAP: u32 = 6;

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub enabled: bool,
    /// `ws://host:port/secret`; the shared secret rides in the path.
    pub endpoint: Url,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub max_connect_attempts: u32,
    pub reconnect_base: Duration,
}

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<ReplyFrame>>>>;

pub struct RconChannel {
    settings: ChannelSettings,
    clock: Arc<dyn Clock>,
    pending: PendingTable,
    next_identifier: AtomicU64,
    state_tx: watch::Sender<ConnectionState>,
    notices_tx: broadcast::Sender<ConsoleLine>,
    writer: Mutex<Option<mpsc::Sender<String>>>,
    // Serializes concurrent connect attempts so only one dial runs.
    connect_lock: tokio::sync::Mutex<()>,
}

impl RconChannel {
    pub fn new(settings: ChannelSettings, clock: Arc<dyn Clock>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (notices_tx, _) = broadcast::channel(NOTICE_BROADCAST_CAPACITY);
        Self {
            settings,
            clock,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_identifier: AtomicU64::new(1),
            state_tx,
            notices_tx,
            writer: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn link_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Unsolicited console output pushed by the server.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<ConsoleLine> {
        self.notices_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.state_tx.borrow().is_ready()
    }

    pub fn default_command_timeout(&self) -> Duration {
        self.settings.command_timeout
    }

    /// Idempotent: returns immediately when already ready; otherwise dials
    /// with a bounded handshake timeout. Failure reports, never panics.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        if !self.settings.enabled {
            return Err(ChannelError::Disabled);
        }

        let _guard = self.connect_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        self.state_tx.send_replace(ConnectionState::Connecting);
        let dial = connect_async(self.settings.endpoint.as_str());
        match tokio::time::timeout(self.settings.connect_timeout, dial).await {
            Ok(Ok((socket, _response))) => {
                let (writer_tx, writer_rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
                {
                    let mut writer = self.writer.lock().expect("writer mutex poisoned");
                    // Dropping a stale sender stops any previous connection task.
                    *writer = Some(writer_tx);
                }
                self.state_tx.send_replace(ConnectionState::Ready);
                tokio::spawn(connection_task(
                    socket,
                    writer_rx,
                    self.pending.clone(),
                    self.state_tx.clone(),
                    self.notices_tx.clone(),
                    self.clock.clone(),
                ));
                info!(
                    host = self.settings.endpoint.host_str().unwrap_or("?"),
                    port = self.settings.endpoint.port().unwrap_or(0),
                    "console link established"
                );
                Ok(())
            }
            Ok(Err(err)) => {
                self.state_tx.send_replace(ConnectionState::Disconnected);
                warn!(error = %err, "console dial failed");
                Err(ChannelError::Handshake(err.to_string()))
            }
            Err(_) => {
                self.state_tx.send_replace(ConnectionState::Disconnected);
                warn!(
                    timeout_ms = self.settings.connect_timeout.as_millis() as u64,
                    "console handshake timed out"
                );
                Err(ChannelError::Handshake("handshake timed out".to_string()))
            }
        }
    }

    /// Retries `connect` with doubling, capped delays up to the configured
    /// attempt ceiling. Success resets the cycle; a disabled link stops it.
    pub async fn connect_with_backoff(&self) -> Result<(), ChannelError> {
        let mut last = ChannelError::NotConnected;
        for attempt in 0..self.settings.max_connect_attempts.max(1) {
            if attempt > 0 {
                let delay = backoff_delay(self.settings.reconnect_base, attempt - 1);
                debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "console dial retry"
                );
                tokio::time::sleep(delay).await;
            }
            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(ChannelError::Disabled) => return Err(ChannelError::Disabled),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    /// Sends one raw command and resolves with the matching reply, a timeout,
    /// or a connection error. Safe to call concurrently; replies demux purely
    /// by identifier, not arrival order.
    pub async fn send(&self, command: &str, timeout: Duration) -> Result<String, ChannelError> {
        if !self.is_ready() {
            self.connect().await?;
        }
        let writer = {
            let guard = self.writer.lock().expect("writer mutex poisoned");
            guard.clone().ok_or(ChannelError::NotConnected)?
        };

        let identifier = self.next_identifier.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending table mutex poisoned");
            pending.insert(identifier, reply_tx);
        }

        let frame = CommandFrame::new(identifier, command);
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                self.forget(identifier);
                return Err(ChannelError::Transport(err.to_string()));
            }
        };
        if writer.send(text).await.is_err() {
            self.forget(identifier);
            return Err(ChannelError::Closed);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply.message),
            // The connection task dropped our sender while draining the table.
            Ok(Err(_)) => Err(ChannelError::Closed),
            Err(_) => {
                // Removing the entry makes any late reply a no-op discard.
                self.forget(identifier);
                Err(ChannelError::Timeout)
            }
        }
    }

    /// Closes the socket and clears state; safe when already disconnected.
    pub async fn disconnect(&self) {
        let writer = {
            let mut guard = self.writer.lock().expect("writer mutex poisoned");
            guard.take()
        };
        // Dropping the sender makes the connection task close the socket,
        // drain the pending table and mark the link down. With no task ever
        // spawned there is nothing to wait on.
        drop(writer);
    }

    fn forget(&self, identifier: u64) {
        let mut pending = self.pending.lock().expect("pending table mutex poisoned");
        pending.remove(&identifier);
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .expect("pending table mutex poisoned")
            .len()
    }
}

pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.min(BACKOFF_DOUBLING_CAP))
}

async fn connection_task(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut writer_rx: mpsc::Receiver<String>,
    pending: PendingTable,
    state_tx: watch::Sender<ConnectionState>,
    notices_tx: broadcast::Sender<ConsoleLine>,
    clock: Arc<dyn Clock>,
) {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            outgoing = writer_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(err) = write.send(Message::Text(text.into())).await {
                            warn!(error = %err, "console write failed");
                            break;
                        }
                    }
                    // The channel dropped the writer: explicit disconnect.
                    None => {
                        let _ = write.close().await;
                        break;
                    }
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(text.as_str(), &pending, &notices_tx, clock.as_ref());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "console read error");
                        break;
                    }
                }
            }
        }
    }

    // Fail everything still in flight: dropping the sinks surfaces as a
    // "connection closed" error on each caller, exactly once per request.
    let outstanding = {
        let mut table = pending.lock().expect("pending table mutex poisoned");
        let count = table.len();
        table.clear();
        count
    };
    state_tx.send_replace(ConnectionState::Disconnected);
    info!(outstanding, "console link closed");
}

fn handle_frame(
    text: &str,
    pending: &PendingTable,
    notices_tx: &broadcast::Sender<ConsoleLine>,
    clock: &dyn Clock,
) {
    let frame: ReplyFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(error = %err, bytes = text.len(), "undecodable console frame");
            return;
        }
    };

    if frame.is_out_of_band() {
        let _ = notices_tx.send(ConsoleLine::new(clock.now_epoch_seconds(), frame.message));
        return;
    }

    let sink = {
        let mut table = pending.lock().expect("pending table mutex poisoned");
        table.remove(&frame.identifier)
    };
    match sink {
        Some(sink) => {
            // The caller may have timed out between lookup and delivery.
            let _ = sink.send(frame);
        }
        None => {
            debug!(identifier = frame.identifier, "late reply discarded");
        }
    }
}
