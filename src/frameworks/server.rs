// Framework bootstrap for the telemetry server runtime.

use crate::domain::heat::MapBounds;
use crate::domain::ports::{ActivityStore, Clock, ConsoleAccess, SystemClock};
use crate::frameworks::config;
use crate::interface_adapters::clients::{MemoryActivityStore, SiteActivityClient};
use crate::interface_adapters::http::{
    ban_handler, broadcast_handler, command_handler, events_handler, give_handler, heat_handler,
    kick_handler, players_handler, telemetry_handler, unban_handler,
};
use crate::interface_adapters::net::live_handler;
use crate::interface_adapters::rcon::{ChannelSettings, RconChannel, RconCommands};
use crate::interface_adapters::state::AppState;
use crate::use_cases::feed::FeedSettings;
use crate::use_cases::players::{
    LiveSource, OnlinePlayersResolver, PlayerSource, RecentActivitySource, SimulatedSource,
};
use crate::use_cases::telemetry::{PipelineSettings, TelemetryPipeline};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the API on an already-bound listener with pre-built state.
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> Result<()> {
    let address = listener.local_addr()?;

    let app = Router::new()
        .route("/players", get(players_handler))
        .route("/events", get(events_handler))
        .route("/telemetry", get(telemetry_handler))
        .route("/heat", get(heat_handler))
        .route("/live", get(live_handler))
        .route("/admin/kick", post(kick_handler))
        .route("/admin/ban", post(ban_handler))
        .route("/admin/unban", post(unban_handler))
        .route("/admin/broadcast", post(broadcast_handler))
        .route("/admin/give", post(give_handler))
        .route("/admin/command", post(command_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let state = build_state().await?;
    serve(listener, state).await
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let endpoint = config::rcon_endpoint(
        &config::rcon_host(),
        config::rcon_port(),
        &config::rcon_secret(),
    )
    .map_err(|e| std::io::Error::other(format!("invalid console endpoint: {e}")))?;
    let channel_settings = ChannelSettings {
        enabled: config::rcon_enabled(),
        endpoint,
        connect_timeout: config::rcon_connect_timeout(),
        command_timeout: config::rcon_command_timeout(),
        max_connect_attempts: config::rcon_max_connect_attempts(),
        reconnect_base: config::rcon_reconnect_base(),
    };
    let channel = Arc::new(RconChannel::new(channel_settings, clock.clone()));
    let commands = Arc::new(RconCommands::new(
        channel.clone(),
        config::rcon_command_timeout(),
    ));

    let store: Arc<dyn ActivityStore> = match config::site_api_url() {
        Some(base_url) => {
            tracing::debug!(
                %base_url,
                timeout_ms = config::site_api_timeout().as_millis() as u64,
                "site activity store configured"
            );
            Arc::new(
                SiteActivityClient::new(base_url, config::site_api_timeout()).map_err(|e| {
                    std::io::Error::other(format!("failed to initialize activity client: {e}"))
                })?,
            )
        }
        None => {
            tracing::debug!("no site configured; last-seen data kept in memory");
            Arc::new(MemoryActivityStore::new())
        }
    };

    // Fallback order is fixed: live console, then recent activity, then the
    // synthetic roster.
    let console: Arc<dyn ConsoleAccess> = commands.clone();
    let sources: Vec<Arc<dyn PlayerSource>> = vec![
        Arc::new(LiveSource::new(console.clone())),
        Arc::new(RecentActivitySource::new(
            store.clone(),
            config::recent_player_window(),
            clock.clone(),
        )),
        Arc::new(SimulatedSource::new(clock.clone())),
    ];
    let resolver = Arc::new(OnlinePlayersResolver::new(sources, store, clock.clone()));

    let pipeline = TelemetryPipeline::spawn(
        PipelineSettings {
            feed: FeedSettings {
                poll_interval: config::event_poll_interval(),
                poll_depth: config::FEED_POLL_DEPTH,
            },
            player_poll_interval: config::player_poll_interval(),
            ring_capacity: config::event_ring_capacity(),
            windows: config::activity_windows(),
            points_of_interest: config::default_points_of_interest(),
            bounds: MapBounds::new(config::world_size()),
            event_broadcast_capacity: config::EVENT_BROADCAST_CAPACITY,
        },
        console,
        channel.subscribe_notices(),
        channel.link_state(),
        resolver,
        clock,
    );
    let telemetry = pipeline.handle();

    // Eagerly dial the console so the push path is live before the first
    // request. Failures here are retried on use, so degrade, don't abort.
    if config::rcon_enabled() {
        let dialer = channel.clone();
        tokio::spawn(async move {
            if let Err(err) = dialer.connect_with_backoff().await {
                tracing::warn!(error = %err, "initial console dial failed; retrying on demand");
            }
        });
    }

    Ok(Arc::new(AppState {
        telemetry,
        commands,
        pipeline: Arc::new(pipeline),
    }))
}
