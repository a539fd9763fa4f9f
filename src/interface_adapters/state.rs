use crate::use_cases::{EngineState, IntentRegistry, SessionEvent, TurnUpdate};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Battle setup echoed to every party in the server handshake.
#[derive(Debug, Clone, Copy)]
pub struct GameSetup {
    pub arena_width: u32,
    pub arena_height: u32,
    pub rounds: u32,
    pub turn_timeout_ms: u64,
}

#[derive(Clone)]
pub struct AppState {
    // Session joins/leaves and control commands flowing into the battle loop.
    pub session_tx: mpsc::Sender<SessionEvent>,
    // Latest-intent store written by bot sessions, read by the battle loop.
    pub intents: Arc<IntentRegistry>,
    // Turn updates produced by the battle loop (domain structs).
    pub turn_tx: broadcast::Sender<TurnUpdate>,
    // Serialized observer-view turn updates, shared across spectators.
    pub turn_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // High-level engine lifecycle state.
    pub engine_state_tx: watch::Sender<EngineState>,
    // Immutable battle setup for handshake replies.
    pub setup: GameSetup,
}
