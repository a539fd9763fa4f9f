// Wire protocol DTOs and conversions for public battle server messages.
// Internal channel types between layers live outside this module.

use serde::{Deserialize, Serialize};

use crate::domain::{BotColors, BotSnapshot, BulletSnapshot, Intent, TurnEvent};
use crate::use_cases::{BotScore, EngineState, TurnUpdate};

/// Game variants this engine can host.
pub const SUPPORTED_GAME_TYPES: [&str; 2] = ["melee", "classic"];

/// Messages the server sends to connected parties over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Reply to a successful handshake: identity plus battle setup.
    ServerHandshake(ServerHandshakeDto),
    // Authoritative snapshot for one turn.
    TurnUpdate(TurnUpdateDto),
    // Lifecycle transitions (awaiting bots, running, paused, ended).
    EngineState(EngineStateDto),
    // Protocol error reply; the session stays open.
    Error { message: String },
}

/// Messages clients send to the server over the WebSocket.
///
/// The first frame on any connection must be one of the handshakes; after
/// that, bots send `Intent` and controllers send the control variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    BotHandshake(BotHandshakeDto),
    ObserverHandshake(SpectatorHandshakeDto),
    ControllerHandshake(SpectatorHandshakeDto),
    Intent(BotIntentDto),
    Start(StartDto),
    Stop,
    Pause,
    Resume,
}

/// Identity metadata a bot declares when joining.
#[derive(Debug, Clone, Deserialize)]
pub struct BotHandshakeDto {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    /// Game variants the bot can play; empty means "anything".
    #[serde(default)]
    pub game_types: Vec<String>,
}

/// Identity metadata for observers and controllers.
#[derive(Debug, Clone, Deserialize)]
pub struct SpectatorHandshakeDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub game_types: Vec<String>,
}

/// Battle setup sent back after any handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ServerHandshakeDto {
    pub session_id: u64,
    pub game_types: Vec<String>,
    pub arena_width: u32,
    pub arena_height: u32,
    pub rounds: u32,
    pub turn_timeout_ms: u64,
}

/// Start request from a controller. The setup is a request, not an order:
/// the engine hosts one configured battle and refuses anything else. The
/// participant list is advisory; the connected roster is authoritative.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartDto {
    #[serde(default)]
    pub game_setup: Option<GameSetupDto>,
    #[serde(default)]
    pub participants: Vec<u64>,
}

/// The battle setup a controller may ask for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSetupDto {
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub arena_width: Option<u32>,
    #[serde(default)]
    pub arena_height: Option<u32>,
    #[serde(default)]
    pub rounds: Option<u32>,
}

/// Cosmetic color set; omitted fields keep their previous value unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotColorsDto {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub turret: Option<String>,
    #[serde(default)]
    pub radar: Option<String>,
    #[serde(default)]
    pub bullet: Option<String>,
    #[serde(default)]
    pub scan: Option<String>,
}

impl From<BotColorsDto> for BotColors {
    fn from(c: BotColorsDto) -> Self {
        Self {
            body: c.body,
            turret: c.turret,
            radar: c.radar,
            bullet: c.bullet,
            scan: c.scan,
        }
    }
}

impl From<&BotColors> for BotColorsDto {
    fn from(c: &BotColors) -> Self {
        Self {
            body: c.body.clone(),
            turret: c.turret.clone(),
            radar: c.radar.clone(),
            bullet: c.bullet.clone(),
            scan: c.scan.clone(),
        }
    }
}

/// A bot's desired actions for the upcoming turn. Absent fields mean "no
/// command"; a new intent fully replaces the previous one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotIntentDto {
    #[serde(default)]
    pub target_speed: Option<f64>,
    #[serde(default)]
    pub turn_rate: Option<f64>,
    #[serde(default)]
    pub gun_turn_rate: Option<f64>,
    #[serde(default)]
    pub radar_turn_rate: Option<f64>,
    #[serde(default)]
    pub firepower: Option<f64>,
    #[serde(default)]
    pub rescan: bool,
    #[serde(default)]
    pub adjust_gun_for_body_turn: Option<bool>,
    #[serde(default)]
    pub adjust_radar_for_gun_turn: Option<bool>,
    #[serde(default)]
    pub colors: Option<BotColorsDto>,
}

impl From<BotIntentDto> for Intent {
    fn from(dto: BotIntentDto) -> Self {
        Self {
            target_speed: dto.target_speed,
            turn_rate: dto.turn_rate,
            gun_turn_rate: dto.gun_turn_rate,
            radar_turn_rate: dto.radar_turn_rate,
            firepower: dto.firepower,
            rescan: dto.rescan,
            adjust_gun_for_body_turn: dto.adjust_gun_for_body_turn,
            adjust_radar_for_gun_turn: dto.adjust_radar_for_gun_turn,
            colors: dto.colors.map(Into::into),
        }
    }
}

/// Flattened bot state for wire transmission in turn updates.
#[derive(Debug, Clone, Serialize)]
pub struct BotStateDto {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub gun_heading: f64,
    pub radar_heading: f64,
    pub speed: f64,
    pub turn_rate: f64,
    pub gun_turn_rate: f64,
    pub radar_turn_rate: f64,
    pub energy: f64,
    pub gun_heat: f64,
    pub alive: bool,
    pub colors: BotColorsDto,
}

impl From<&BotSnapshot> for BotStateDto {
    fn from(b: &BotSnapshot) -> Self {
        Self {
            id: b.id,
            x: b.x,
            y: b.y,
            heading: b.heading,
            gun_heading: b.gun_heading,
            radar_heading: b.radar_heading,
            speed: b.speed,
            turn_rate: b.turn_rate,
            gun_turn_rate: b.gun_turn_rate,
            radar_turn_rate: b.radar_turn_rate,
            energy: b.energy,
            gun_heat: b.gun_heat,
            alive: b.alive,
            colors: BotColorsDto::from(&b.colors),
        }
    }
}

/// Flattened bullet state for wire transmission in turn updates.
#[derive(Debug, Clone, Serialize)]
pub struct BulletStateDto {
    pub id: u64,
    pub owner_id: u64,
    pub power: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&BulletSnapshot> for BulletStateDto {
    fn from(p: &BulletSnapshot) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            power: p.power,
            x: p.x,
            y: p.y,
            heading: p.heading,
            speed: p.speed,
            color: p.color.clone(),
        }
    }
}

/// Events generated by one turn, for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum TurnEventDto {
    WallHit {
        bot_id: u64,
        energy_lost: f64,
        bearing: f64,
    },
    BotHitBot {
        bot_ids: [u64; 2],
        damage: f64,
    },
    BulletHitBot {
        bullet_id: u64,
        owner_id: u64,
        victim_id: u64,
        damage: f64,
        victim_energy: f64,
    },
    BulletHitBullet {
        bullet_ids: [u64; 2],
    },
    BulletHitWall {
        bullet_id: u64,
    },
    BotDeath {
        bot_id: u64,
    },
    ScannedBot {
        scanned_by: u64,
        bot: BotStateDto,
    },
    SkippedTurn {
        bot_id: u64,
    },
    RoundEnded {
        survivor_ids: Vec<u64>,
    },
}

impl From<&TurnEvent> for TurnEventDto {
    fn from(event: &TurnEvent) -> Self {
        match event {
            TurnEvent::WallHit {
                bot_id,
                energy_lost,
                bearing,
            } => Self::WallHit {
                bot_id: *bot_id,
                energy_lost: *energy_lost,
                bearing: *bearing,
            },
            TurnEvent::BotHitBot { bot_ids, damage } => Self::BotHitBot {
                bot_ids: *bot_ids,
                damage: *damage,
            },
            TurnEvent::BulletHitBot {
                bullet_id,
                owner_id,
                victim_id,
                damage,
                victim_energy,
            } => Self::BulletHitBot {
                bullet_id: *bullet_id,
                owner_id: *owner_id,
                victim_id: *victim_id,
                damage: *damage,
                victim_energy: *victim_energy,
            },
            TurnEvent::BulletHitBullet { bullet_ids } => Self::BulletHitBullet {
                bullet_ids: *bullet_ids,
            },
            TurnEvent::BulletHitWall { bullet_id } => Self::BulletHitWall {
                bullet_id: *bullet_id,
            },
            TurnEvent::BotDeath { bot_id } => Self::BotDeath { bot_id: *bot_id },
            TurnEvent::ScannedBot { scanned_by, bot } => Self::ScannedBot {
                scanned_by: *scanned_by,
                bot: BotStateDto::from(bot),
            },
            TurnEvent::SkippedTurn { bot_id } => Self::SkippedTurn { bot_id: *bot_id },
            TurnEvent::RoundEnded { survivor_ids } => Self::RoundEnded {
                survivor_ids: survivor_ids.clone(),
            },
        }
    }
}

/// Snapshot of one turn sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TurnUpdateDto {
    pub round: u32,
    pub turn: u64,
    pub bots: Vec<BotStateDto>,
    pub bullets: Vec<BulletStateDto>,
    pub events: Vec<TurnEventDto>,
}

impl TurnUpdateDto {
    /// Full view for observers and controllers, every event included.
    pub fn for_observer(update: &TurnUpdate) -> Self {
        Self::build(update, None)
    }

    /// A bot's view: scan events belonging to other bots are withheld.
    pub fn for_bot(update: &TurnUpdate, bot_id: u64) -> Self {
        Self::build(update, Some(bot_id))
    }

    fn build(update: &TurnUpdate, viewer: Option<u64>) -> Self {
        let events = update
            .events
            .iter()
            .filter(|event| match (event, viewer) {
                (TurnEvent::ScannedBot { scanned_by, .. }, Some(id)) => *scanned_by == id,
                _ => true,
            })
            .map(TurnEventDto::from)
            .collect();
        Self {
            round: update.round,
            turn: update.turn,
            bots: update.bots.iter().map(Into::into).collect(),
            bullets: update.bullets.iter().map(Into::into).collect(),
            events,
        }
    }
}

/// Final standing of one bot.
#[derive(Debug, Clone, Serialize)]
pub struct BotResultDto {
    pub bot_id: u64,
    pub name: String,
    pub bullet_damage: f64,
    pub ram_damage: f64,
    pub survival: f64,
    pub last_survivor_bonus: f64,
    pub total_score: f64,
}

impl From<&BotScore> for BotResultDto {
    fn from(s: &BotScore) -> Self {
        Self {
            bot_id: s.bot_id,
            name: s.name.clone(),
            bullet_damage: s.bullet_damage,
            ram_damage: s.ram_damage,
            survival: s.survival,
            last_survivor_bonus: s.last_survivor_bonus,
            total_score: s.total(),
        }
    }
}

/// Engine lifecycle state sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "data")]
pub enum EngineStateDto {
    AwaitingBots,
    RoundRunning { round: u32 },
    Paused { round: u32 },
    RoundEnded { round: u32 },
    BattleEnded { results: Vec<BotResultDto> },
}

impl From<&EngineState> for EngineStateDto {
    fn from(state: &EngineState) -> Self {
        match state {
            EngineState::AwaitingBots => EngineStateDto::AwaitingBots,
            EngineState::RoundRunning { round } => EngineStateDto::RoundRunning { round: *round },
            EngineState::Paused { round } => EngineStateDto::Paused { round: *round },
            EngineState::RoundEnded { round } => EngineStateDto::RoundEnded { round: *round },
            EngineState::BattleEnded { results } => EngineStateDto::BattleEnded {
                results: results.iter().map(Into::into).collect(),
            },
        }
    }
}
