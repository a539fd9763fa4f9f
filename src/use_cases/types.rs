// Use-case level inputs/outputs for the battle loop.

use crate::domain::{BotSnapshot, BulletSnapshot, TurnEvent};
use crate::use_cases::scoring::BotScore;

/// Events flowing from session tasks into the battle loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    BotJoined {
        bot_id: u64,
        name: String,
        version: String,
        author: String,
    },
    BotLeft {
        bot_id: u64,
    },
    Control {
        command: ControlCommand,
    },
}

/// Controller commands. Idempotent: invalid transitions are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Pause,
    Resume,
}

/// High-level engine lifecycle, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    AwaitingBots,
    RoundRunning { round: u32 },
    Paused { round: u32 },
    RoundEnded { round: u32 },
    BattleEnded { results: Vec<BotScore> },
}

/// Authoritative per-turn snapshot broadcast to every session.
#[derive(Debug, Clone)]
pub struct TurnUpdate {
    pub round: u32,
    pub turn: u64,
    pub bots: Vec<BotSnapshot>,
    pub bullets: Vec<BulletSnapshot>,
    pub events: Vec<TurnEvent>,
}
