// Use cases layer: application workflows for the battle server.

pub mod battle;
pub mod intents;
pub mod scoring;
pub mod types;

pub use battle::{BattleSettings, battle_task};
pub use intents::IntentRegistry;
pub use scoring::{BotScore, RoundTally, ScoreBoard};
pub use types::{ControlCommand, EngineState, SessionEvent, TurnUpdate};
