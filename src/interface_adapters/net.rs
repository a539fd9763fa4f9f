// WebSocket session handling: handshakes, intent routing and turn fan-out.

use crate::domain::Intent;
use crate::interface_adapters::protocol::{
    BotIntentDto, ClientMessage, EngineStateDto, SUPPORTED_GAME_TYPES, ServerHandshakeDto,
    ServerMessage, StartDto, TurnUpdateDto,
};
use crate::interface_adapters::state::{AppState, GameSetup};
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{ControlCommand, EngineState, SessionEvent, TurnUpdate};

use futures_util::sink::SinkExt;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    SessionEventsClosed,
    TurnUpdatesClosed,
    EngineStateClosed,
    HandshakeTimeout,
    BadHandshake,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_INVALID_JSON: u32 = 10;
const MAX_BOT_NAME_LEN: usize = 32;
const MAX_BOT_META_LEN: usize = 64;
const DEFAULT_BOT_NAME: &str = "Anonymous";

/// Serializes each turn update once and broadcasts the shared bytes to all
/// observer/controller sessions. Bot sessions serialize their own view
/// because scan events are private to the scanning bot.
pub async fn turn_update_serializer(
    mut turn_rx: broadcast::Receiver<TurnUpdate>,
    turn_bytes_tx: broadcast::Sender<Utf8Bytes>,
) {
    loop {
        match turn_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::TurnUpdate(TurnUpdateDto::for_observer(&update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize turn update");
                        continue;
                    }
                };
                let _ = turn_bytes_tx.send(Utf8Bytes::from(txt));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "turn serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("turn update channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// JSON engine state for probes and dashboards.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine_state_tx.subscribe().borrow().clone();
    axum::Json(EngineStateDto::from(&snapshot))
}

/// The party a connection identified itself as during the handshake.
enum Role {
    Bot { bot_id: u64 },
    Observer,
    Controller,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let session_id = rand_id();
    let span = info_span!("conn", session_id, bot_id = tracing::field::Empty);
    let _enter = span.enter();

    let (role, mut engine_state_rx) = match bootstrap_connection(&mut socket, &state).await {
        Ok(ok) => ok,
        Err(e) => {
            debug!(error = ?e, "connection bootstrap failed");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "handshake failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    let mut stats = ConnStats::default();
    let result = match role {
        Role::Bot { bot_id } => {
            span.record("bot_id", bot_id);
            info!("bot connected");
            let r = run_bot_loop(&mut socket, &state, bot_id, &mut engine_state_rx, &mut stats)
                .await;
            bot_disconnect_cleanup(&state, bot_id).await;
            r
        }
        Role::Observer => {
            info!("observer connected");
            run_spectator_loop(&mut socket, &state, false, &mut engine_state_rx, &mut stats).await
        }
        Role::Controller => {
            info!("controller connected");
            run_spectator_loop(&mut socket, &state, true, &mut engine_state_rx, &mut stats).await
        }
    };

    debug!(
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        invalid_json = stats.invalid_json,
        "connection stats"
    );
    if let Err(e) = result {
        warn!(error = ?e, "session loop exited with error");
    }
    info!("client disconnected");
}

/// Waits for the mandatory handshake frame and replies with the battle setup.
///
/// Broadcast subscriptions happen before any await on the battle side so no
/// turn published after the handshake can be missed.
async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> Result<(Role, watch::Receiver<EngineState>), NetError> {
    let engine_state_rx = state.engine_state_tx.subscribe();

    let first = tokio::time::timeout(HANDSHAKE_TIMEOUT, socket.recv())
        .await
        .map_err(|_| NetError::HandshakeTimeout)?;
    let Some(Ok(Message::Text(text))) = first else {
        return Err(NetError::BadHandshake);
    };

    let role = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(ClientMessage::BotHandshake(payload)) => {
            // An empty declaration means the bot plays anything.
            if !payload.game_types.is_empty()
                && !payload
                    .game_types
                    .iter()
                    .any(|t| SUPPORTED_GAME_TYPES.contains(&t.as_str()))
            {
                let _ = send_message(
                    socket,
                    &ServerMessage::Error {
                        message: format!(
                            "none of the declared game types are hosted here: {:?}",
                            payload.game_types
                        ),
                    },
                )
                .await;
                return Err(NetError::BadHandshake);
            }
            let bot_id = rand_id();
            let mut name = payload.name.trim().to_string();
            if name.is_empty() {
                name = DEFAULT_BOT_NAME.to_string();
            }
            name.truncate(MAX_BOT_NAME_LEN);
            let mut version = payload.version;
            version.truncate(MAX_BOT_META_LEN);
            let mut author = payload.author;
            author.truncate(MAX_BOT_META_LEN);

            state
                .session_tx
                .send(SessionEvent::BotJoined {
                    bot_id,
                    name,
                    version,
                    author,
                })
                .await
                .map_err(|_| NetError::SessionEventsClosed)?;
            Role::Bot { bot_id }
        }
        Ok(ClientMessage::ObserverHandshake(_)) => Role::Observer,
        Ok(ClientMessage::ControllerHandshake(_)) => Role::Controller,
        Ok(_) => {
            let _ = send_message(
                socket,
                &ServerMessage::Error {
                    message: "expected a handshake as the first message".into(),
                },
            )
            .await;
            return Err(NetError::BadHandshake);
        }
        Err(e) => {
            let _ = send_message(
                socket,
                &ServerMessage::Error {
                    message: format!("malformed handshake: {e}"),
                },
            )
            .await;
            return Err(NetError::BadHandshake);
        }
    };

    let session_id = match role {
        Role::Bot { bot_id } => bot_id,
        _ => rand_id(),
    };
    send_message(
        socket,
        &ServerMessage::ServerHandshake(ServerHandshakeDto {
            session_id,
            game_types: SUPPORTED_GAME_TYPES.iter().map(|t| t.to_string()).collect(),
            arena_width: state.setup.arena_width,
            arena_height: state.setup.arena_height,
            rounds: state.setup.rounds,
            turn_timeout_ms: state.setup.turn_timeout_ms,
        }),
    )
    .await?;

    // Initial lifecycle state so clients don't wait for the next transition.
    let initial = engine_state_rx.borrow().clone();
    send_message(
        socket,
        &ServerMessage::EngineState(EngineStateDto::from(&initial)),
    )
    .await?;

    Ok((role, engine_state_rx))
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

#[derive(Default)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,
}

enum LoopControl {
    Continue,
    Disconnect,
}

/// Rejects intents carrying NaN/infinite values before they reach the
/// simulation.
fn sanitize_intent(dto: &BotIntentDto) -> bool {
    [
        dto.target_speed,
        dto.turn_rate,
        dto.gun_turn_rate,
        dto.radar_turn_rate,
        dto.firepower,
    ]
    .iter()
    .flatten()
    .all(|v| v.is_finite())
}

async fn run_bot_loop(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    bot_id: u64,
    engine_state_rx: &mut watch::Receiver<EngineState>,
    stats: &mut ConnStats,
) -> Result<(), NetError> {
    let mut turn_rx = state.turn_tx.subscribe();
    let mut close_frame: Option<CloseFrame> = None;

    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match handle_bot_incoming(socket, incoming, state, bot_id, stats, &mut close_frame).await? {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            update = turn_rx.recv() => {
                match update {
                    Ok(update) => {
                        let msg = ServerMessage::TurnUpdate(TurnUpdateDto::for_bot(&update, bot_id));
                        match send_message(socket, &msg).await {
                            Ok(()) => {
                                stats.msgs_out += 1;
                                false
                            }
                            Err(e) => {
                                warn!(error = ?e, "failed to send turn update");
                                true
                            }
                        }
                    }
                    // Outbound queue overflow: drop the connection rather
                    // than ever slowing the battle loop.
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(bot_id, missed = n, "bot session lagged; disconnecting");
                        close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too slow consuming turn updates".into(),
                        });
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetError::TurnUpdatesClosed);
                    }
                }
            }

            changed = engine_state_rx.changed() => {
                match changed {
                    Ok(()) => {
                        forward_engine_state(socket, engine_state_rx, stats).await
                    }
                    Err(_) => return Err(NetError::EngineStateClosed),
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(e) = socket.close().await {
                debug!(error = ?e, "socket close error");
            }
            return Ok(());
        }
    }
}

async fn handle_bot_incoming(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
    state: &Arc<AppState>,
    bot_id: u64,
    stats: &mut ConnStats,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            stats.msgs_in += 1;
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Intent(dto)) => {
                    if !sanitize_intent(&dto) {
                        let _ = send_message(
                            socket,
                            &ServerMessage::Error {
                                message: "intent contains non-finite values".into(),
                            },
                        )
                        .await;
                        return Ok(LoopControl::Continue);
                    }
                    // Overwrites any pending intent; the newest wins.
                    state.intents.submit(bot_id, Intent::from(dto));
                    Ok(LoopControl::Continue)
                }
                Ok(_) => {
                    let _ = send_message(
                        socket,
                        &ServerMessage::Error {
                            message: "bots may only send intents after the handshake".into(),
                        },
                    )
                    .await;
                    Ok(LoopControl::Continue)
                }
                Err(e) => {
                    handle_malformed(socket, &text, e, stats, close_frame).await
                }
            }
        }
        other => Ok(handle_non_text(other, close_frame)),
    }
}

async fn run_spectator_loop(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    can_control: bool,
    engine_state_rx: &mut watch::Receiver<EngineState>,
    stats: &mut ConnStats,
) -> Result<(), NetError> {
    let mut turn_bytes_rx = state.turn_bytes_tx.subscribe();
    let mut close_frame: Option<CloseFrame> = None;

    loop {
        let disconnect = tokio::select! {
            incoming = socket.recv() => {
                match handle_spectator_incoming(socket, incoming, state, can_control, stats, &mut close_frame).await? {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            bytes = turn_bytes_rx.recv() => {
                match bytes {
                    Ok(bytes) => match socket.send(Message::Text(bytes)).await {
                        Ok(()) => {
                            stats.msgs_out += 1;
                            false
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to forward turn update");
                            true
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "spectator session lagged; disconnecting");
                        close_frame = Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "too slow consuming turn updates".into(),
                        });
                        true
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(NetError::TurnUpdatesClosed);
                    }
                }
            }

            changed = engine_state_rx.changed() => {
                match changed {
                    Ok(()) => {
                        forward_engine_state(socket, engine_state_rx, stats).await
                    }
                    Err(_) => return Err(NetError::EngineStateClosed),
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(e) = socket.close().await {
                debug!(error = ?e, "socket close error");
            }
            return Ok(());
        }
    }
}

async fn handle_spectator_incoming(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
    state: &Arc<AppState>,
    can_control: bool,
    stats: &mut ConnStats,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(Message::Text(text))) => {
            stats.msgs_in += 1;
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    let command = match msg {
                        ClientMessage::Start(start) => {
                            if can_control {
                                if let Err(reason) = validate_start(&start, &state.setup) {
                                    let _ = send_message(
                                        socket,
                                        &ServerMessage::Error { message: reason },
                                    )
                                    .await;
                                    return Ok(LoopControl::Continue);
                                }
                                if !start.participants.is_empty() {
                                    debug!(
                                        participants = ?start.participants,
                                        "start requested an explicit roster; connected bots win"
                                    );
                                }
                            }
                            Some(ControlCommand::Start)
                        }
                        ClientMessage::Stop => Some(ControlCommand::Stop),
                        ClientMessage::Pause => Some(ControlCommand::Pause),
                        ClientMessage::Resume => Some(ControlCommand::Resume),
                        _ => None,
                    };
                    match command {
                        Some(command) if can_control => {
                            state
                                .session_tx
                                .send(SessionEvent::Control { command })
                                .await
                                .map_err(|_| NetError::SessionEventsClosed)?;
                        }
                        Some(_) => {
                            let _ = send_message(
                                socket,
                                &ServerMessage::Error {
                                    message: "observers cannot send control commands".into(),
                                },
                            )
                            .await;
                        }
                        None => {
                            let _ = send_message(
                                socket,
                                &ServerMessage::Error {
                                    message: "unexpected message for this session role".into(),
                                },
                            )
                            .await;
                        }
                    }
                    Ok(LoopControl::Continue)
                }
                Err(e) => handle_malformed(socket, &text, e, stats, close_frame).await,
            }
        }
        other => Ok(handle_non_text(other, close_frame)),
    }
}

/// Controllers may ask for a specific setup; the engine hosts exactly one
/// configured battle, so anything else is refused with an error reply.
fn validate_start(start: &StartDto, setup: &GameSetup) -> Result<(), String> {
    let Some(requested) = &start.game_setup else {
        return Ok(());
    };
    if let Some(game_type) = &requested.game_type {
        if !SUPPORTED_GAME_TYPES.contains(&game_type.as_str()) {
            return Err(format!("unsupported game type: {game_type}"));
        }
    }
    let mismatch = requested.arena_width.is_some_and(|w| w != setup.arena_width)
        || requested
            .arena_height
            .is_some_and(|h| h != setup.arena_height)
        || requested.rounds.is_some_and(|r| r != setup.rounds);
    if mismatch {
        return Err("requested setup does not match the hosted battle".into());
    }
    Ok(())
}

/// Malformed frames get an error reply; repeat offenders get closed.
async fn handle_malformed(
    socket: &mut WebSocket,
    text: &str,
    parse_err: serde_json::Error,
    stats: &mut ConnStats,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    stats.invalid_json += 1;
    warn!(
        bytes = text.len(),
        error = %parse_err,
        "failed to parse client message"
    );
    let _ = send_message(
        socket,
        &ServerMessage::Error {
            message: format!("malformed message: {parse_err}"),
        },
    )
    .await;

    if stats.invalid_json > MAX_INVALID_JSON {
        *close_frame = Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        });
        return Ok(LoopControl::Disconnect);
    }
    Ok(LoopControl::Continue)
}

fn handle_non_text(
    incoming: Option<Result<Message, axum::Error>>,
    close_frame: &mut Option<CloseFrame>,
) -> LoopControl {
    match incoming {
        Some(Ok(Message::Binary(_))) => {
            *close_frame = Some(CloseFrame {
                code: close_code::UNSUPPORTED,
                reason: "binary messages not supported".into(),
            });
            LoopControl::Disconnect
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => LoopControl::Continue,
        Some(Ok(Message::Close(_))) | None => LoopControl::Disconnect,
        Some(Ok(Message::Text(_))) => LoopControl::Continue,
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
    }
}

async fn forward_engine_state(
    socket: &mut WebSocket,
    engine_state_rx: &mut watch::Receiver<EngineState>,
    stats: &mut ConnStats,
) -> bool {
    // Clone as soon as we borrow so no watch lock is held across the send.
    let snapshot = engine_state_rx.borrow_and_update().clone();
    let msg = ServerMessage::EngineState(EngineStateDto::from(&snapshot));
    match send_message(socket, &msg).await {
        Ok(()) => {
            stats.msgs_out += 1;
            false
        }
        Err(e) => {
            warn!(error = ?e, "failed to send engine state");
            true
        }
    }
}

/// Transport failure or explicit close: the bot leaves starting next round.
async fn bot_disconnect_cleanup(state: &Arc<AppState>, bot_id: u64) {
    state.intents.remove(bot_id);
    if state
        .session_tx
        .send(SessionEvent::BotLeft { bot_id })
        .await
        .is_err()
    {
        warn!(bot_id, "battle task gone during disconnect cleanup");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::protocol::GameSetupDto;

    fn setup() -> GameSetup {
        GameSetup {
            arena_width: 800,
            arena_height: 600,
            rounds: 10,
            turn_timeout_ms: 33,
        }
    }

    fn start_with(game_setup: GameSetupDto) -> StartDto {
        StartDto {
            game_setup: Some(game_setup),
            participants: Vec::new(),
        }
    }

    #[test]
    fn bare_start_requests_are_accepted() {
        assert!(validate_start(&StartDto::default(), &setup()).is_ok());
    }

    #[test]
    fn start_matching_the_hosted_setup_is_accepted() {
        let start = start_with(GameSetupDto {
            game_type: Some("melee".into()),
            arena_width: Some(800),
            arena_height: Some(600),
            rounds: Some(10),
        });
        assert!(validate_start(&start, &setup()).is_ok());
    }

    #[test]
    fn start_with_a_foreign_arena_is_refused() {
        let start = start_with(GameSetupDto {
            arena_width: Some(1000),
            ..GameSetupDto::default()
        });
        assert!(validate_start(&start, &setup()).is_err());
    }

    #[test]
    fn start_with_an_unsupported_game_type_is_refused() {
        let start = start_with(GameSetupDto {
            game_type: Some("capture_the_flag".into()),
            ..GameSetupDto::default()
        });
        assert!(validate_start(&start, &setup()).is_err());
    }
}
