// Framework bootstrap for the battle server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::{status_handler, turn_update_serializer, ws_handler};
use crate::interface_adapters::state::{AppState, GameSetup};
use crate::use_cases::{
    BattleSettings, EngineState, IntentRegistry, SessionEvent, TurnUpdate, battle_task,
};

use axum::extract::ws::Utf8Bytes;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

use crate::domain::Arena;

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

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

/// Wires every channel and spawns the battle loop plus the observer-stream
/// serializer. All shared state is constructed here and injected; nothing
/// is process-global.
fn build_state() -> Arc<AppState> {
    let settings = BattleSettings {
        arena: Arena::new(config::arena_width(), config::arena_height()),
        turn_interval: config::turn_interval(),
        rounds: config::rounds(),
        max_turns: config::max_turns(),
        min_participants: config::min_participants(),
    };
    tracing::info!(
        arena_width = config::arena_width(),
        arena_height = config::arena_height(),
        tps = config::tps(),
        rounds = settings.rounds,
        "battle configured"
    );

    // session_tx/rx: joins, leaves and control commands into the battle task.
    let (session_tx, session_rx) =
        mpsc::channel::<SessionEvent>(config::SESSION_CHANNEL_CAPACITY);

    // turn_tx/rx: per-turn snapshots broadcast to all sessions.
    let (turn_tx, _turn_rx) = broadcast::channel::<TurnUpdate>(config::TURN_BROADCAST_CAPACITY);

    // turn_bytes_tx/rx: observer-view updates serialized once, shared.
    let (turn_bytes_tx, _turn_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::TURN_BROADCAST_CAPACITY);

    // engine_state_tx: lifecycle transitions (awaiting/running/paused/ended).
    let (engine_state_tx, _engine_state_rx) =
        watch::channel::<EngineState>(EngineState::AwaitingBots);

    let intents = Arc::new(IntentRegistry::new());

    // The authoritative battle loop; sole owner of the world.
    tokio::spawn(battle_task(
        session_rx,
        Arc::clone(&intents),
        turn_tx.clone(),
        engine_state_tx.clone(),
        settings,
    ));

    // Serialize each turn once for all observer/controller sessions.
    tokio::spawn(turn_update_serializer(
        turn_tx.subscribe(),
        turn_bytes_tx.clone(),
    ));

    Arc::new(AppState {
        session_tx,
        intents,
        turn_tx,
        turn_bytes_tx,
        engine_state_tx,
        setup: GameSetup {
            arena_width: config::arena_width(),
            arena_height: config::arena_height(),
            rounds: config::rounds(),
            turn_timeout_ms: config::turn_interval().as_millis() as u64,
        },
    })
}
