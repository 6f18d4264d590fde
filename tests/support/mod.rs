// Shared primitives for integration tests: a scripted console endpoint that
// speaks the WebSocket frame protocol, and one-time service bootstrapping for
// HTTP tests. Not every test binary uses every helper.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

// Global service handles published once the bootstrap thread binds a port.
static SERVICE: OnceLock<(String, FakeConsole)> = OnceLock::new();

/// A console endpoint with scripted replies. Commands are recorded, `echo`
/// replies can be delayed to force out-of-order arrival, `hold` never answers,
/// and identifier-0 notices can be pushed at will.
#[derive(Clone)]
pub struct FakeConsole {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    notices: broadcast::Sender<String>,
    close: broadcast::Sender<()>,
    refusals: Arc<AtomicUsize>,
    playerlist: Arc<Mutex<String>>,
    backlog: Arc<Mutex<String>>,
}

impl FakeConsole {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind scripted console port");
        let addr = listener.local_addr().expect("get console addr");
        let (notices, _) = broadcast::channel(64);
        let (close, _) = broadcast::channel(8);
        let console = Self {
            addr,
            commands: Arc::new(Mutex::new(Vec::new())),
            notices,
            close,
            refusals: Arc::new(AtomicUsize::new(0)),
            playerlist: Arc::new(Mutex::new(default_playerlist())),
            backlog: Arc::new(Mutex::new("[]".to_string())),
        };

        let accept = console.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                // A refusal drops the raw socket so the client handshake fails.
                if accept.refusals.load(Ordering::SeqCst) > 0 {
                    accept.refusals.fetch_sub(1, Ordering::SeqCst);
                    drop(stream);
                    continue;
                }
                tokio::spawn(handle_connection(stream, accept.clone()));
            }
        });

        console
    }

    /// Pushes an unsolicited identifier-0 line to every open connection.
    pub fn push_notice(&self, text: &str) {
        let _ = self.notices.send(text.to_string());
    }

    /// Makes the next `count` connection attempts fail before the handshake.
    pub fn refuse_next(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// Closes every open connection from the server side.
    pub fn close_connections(&self) {
        let _ = self.close.send(());
    }

    pub fn commands_seen(&self) -> Vec<String> {
        self.commands.lock().expect("commands mutex poisoned").clone()
    }

    pub fn set_playerlist(&self, payload: &str) {
        *self.playerlist.lock().expect("playerlist mutex poisoned") = payload.to_string();
    }

    pub fn set_backlog(&self, payload: &str) {
        *self.backlog.lock().expect("backlog mutex poisoned") = payload.to_string();
    }
}

async fn handle_connection(stream: TcpStream, console: FakeConsole) {
    let Ok(socket) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = socket.split();
    // Delayed echoes and direct replies serialize through one queue.
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(64);
    let mut notices_rx = console.notices.subscribe();
    let mut close_rx = console.close.subscribe();

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(value) = serde_json::from_str::<serde_json::Value>(text.as_str())
                        else {
                            continue;
                        };
                        let identifier = value["Identifier"].as_u64().unwrap_or(0);
                        let command = value["Message"].as_str().unwrap_or("").to_string();
                        console
                            .commands
                            .lock()
                            .expect("commands mutex poisoned")
                            .push(command.clone());
                        script_reply(identifier, &command, &console, reply_tx.clone());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            reply = reply_rx.recv() => {
                let Some(text) = reply else { break };
                if write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            notice = notices_rx.recv() => {
                let Ok(text) = notice else { continue };
                let frame = reply_frame(0, &text);
                if write.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = close_rx.recv() => {
                let _ = write.close().await;
                break;
            }
        }
    }
}

fn script_reply(identifier: u64, command: &str, console: &FakeConsole, reply_tx: mpsc::Sender<String>) {
    // `echo <delay_ms> <text>` answers with the text after the delay.
    if let Some(rest) = command.strip_prefix("echo ") {
        if let Some((delay, text)) = rest.split_once(' ') {
            if let Ok(delay) = delay.parse::<u64>() {
                let text = text.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    let _ = reply_tx.send(reply_frame(identifier, &text)).await;
                });
                return;
            }
        }
    }
    // `hold` never answers, so callers run into their own timeout.
    if command == "hold" || command.starts_with("hold ") {
        return;
    }

    let message = if command == "serverinfo" {
        json!({
            "Hostname": "Scripted Test Server",
            "MaxPlayers": 100,
            "Players": 2,
            "Queued": 0,
            "Joining": 0,
            "Map": "Procedural Map",
            "Framerate": 60.0,
            "Uptime": 3_600,
        })
        .to_string()
    } else if command == "playerlist" {
        console
            .playerlist
            .lock()
            .expect("playerlist mutex poisoned")
            .clone()
    } else if command.starts_with("console.tail") {
        console.backlog.lock().expect("backlog mutex poisoned").clone()
    } else {
        // Mutations get an empty acknowledgement, like the real console.
        String::new()
    };
    tokio::spawn(async move {
        let _ = reply_tx.send(reply_frame(identifier, &message)).await;
    });
}

fn reply_frame(identifier: u64, message: &str) -> String {
    json!({
        "Identifier": identifier,
        "Message": message,
        "Type": "Generic",
    })
    .to_string()
}

fn default_playerlist() -> String {
    json!([
        {
            "SteamID": "76561198000000001",
            "DisplayName": "[ZERG] Moss",
            "Ping": 42,
            "ConnectedSeconds": 731,
            "Health": 88.5,
        },
        {
            "SteamID": "76561198000000002",
            "DisplayName": "Ratte",
            "Ping": 60,
            "ConnectedSeconds": 120,
            "Health": 100.0,
        },
    ])
    .to_string()
}

/// Boots the service once, wired to a scripted console, and returns the
/// shared base URL plus the console handle.
pub fn ensure_service() -> (&'static str, &'static FakeConsole) {
    let (base_url, console) = SERVICE.get_or_init(|| {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        // An OS thread so the service outlives individual test runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let console = FakeConsole::spawn().await;
                // Point the service at the scripted console before it boots.
                // Every test in this binary blocks on `get_or_init`, so no
                // other thread reads the environment concurrently.
                unsafe {
                    std::env::set_var("RCON_HOST", console.addr.ip().to_string());
                    std::env::set_var("RCON_PORT", console.addr.port().to_string());
                    std::env::set_var("RCON_SECRET", "test-secret");
                    std::env::set_var("RCON_CONNECT_TIMEOUT_MS", "1000");
                    std::env::set_var("RCON_COMMAND_TIMEOUT_MS", "1000");
                    std::env::set_var("EVENT_POLL_INTERVAL_SECS", "1");
                    std::env::set_var("PLAYER_POLL_INTERVAL_SECS", "1");
                }

                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                ready_tx
                    .send((format!("http://{addr}"), console.clone()))
                    .expect("publish service handles");
                telemetry_server::run(listener).await.expect("server failed");
            });
        });
        let handles = ready_rx.recv().expect("service should start");
        wait_for_readiness(&handles.0);
        handles
    });
    (base_url.as_str(), console)
}

// Retry raw TCP connects until the bound port accepts, or fail fast.
fn wait_for_readiness(base_url: &str) {
    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("service did not become ready in time");
}
