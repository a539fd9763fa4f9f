// Domain-level simulation entities and intent/snapshot types.

use super::rules;

/// Immutable 2D coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rectangular battlefield bounds. Created at battle setup; never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    width: f64,
    height: f64,
}

impl Arena {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// True when a point lies within the bounds, edges inclusive.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }
}

/// Optional cosmetic colors a bot may set; carried as opaque state fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotColors {
    pub body: Option<String>,
    pub turret: Option<String>,
    pub radar: Option<String>,
    pub bullet: Option<String>,
    pub scan: Option<String>,
}

/// A bot's desired actions for the upcoming turn.
///
/// `None` fields mean "no command": the bot coasts at its current speed and
/// does not turn. A new submission fully replaces the prior one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intent {
    pub target_speed: Option<f64>,
    pub turn_rate: Option<f64>,
    pub gun_turn_rate: Option<f64>,
    pub radar_turn_rate: Option<f64>,
    pub firepower: Option<f64>,
    pub rescan: bool,
    pub adjust_gun_for_body_turn: Option<bool>,
    pub adjust_radar_for_gun_turn: Option<bool>,
    pub colors: Option<BotColors>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimBot {
    pub id: u64,
    pub position: Point,

    // Degrees in [0, 360).
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

    pub colors: BotColors,

    // Per-turn working state (do not serialize to clients).
    pub target_speed: f64,
    pub adjust_gun_for_body_turn: bool,
    pub adjust_radar_for_gun_turn: bool,
    // Radar arc swept last turn, for rescan: (start heading, signed delta).
    pub last_radar_sweep: (f64, f64),
    // Position before this turn's integration, for collision rewind.
    pub previous_position: Point,
}

impl SimBot {
    /// A freshly placed bot at round start.
    pub fn placed(id: u64, position: Point, heading: f64) -> Self {
        Self {
            id,
            position,
            heading,
            gun_heading: heading,
            radar_heading: heading,
            speed: 0.0,
            turn_rate: 0.0,
            gun_turn_rate: 0.0,
            radar_turn_rate: 0.0,
            energy: rules::INITIAL_ENERGY,
            gun_heat: rules::INITIAL_GUN_HEAT,
            alive: true,
            colors: BotColors::default(),
            target_speed: 0.0,
            adjust_gun_for_body_turn: false,
            adjust_radar_for_gun_turn: false,
            last_radar_sweep: (heading, 0.0),
            previous_position: position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimBullet {
    pub id: u64,
    pub owner_id: u64,
    pub power: f64,
    pub position: Point,
    pub heading: f64,
    pub speed: f64,
    pub color: Option<String>,

    // Position before this turn's advance, for swept collision checks.
    pub previous_position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotSnapshot {
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
    pub colors: BotColors,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletSnapshot {
    pub id: u64,
    pub owner_id: u64,
    pub power: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed: f64,
    pub color: Option<String>,
}

impl From<&SimBot> for BotSnapshot {
    fn from(b: &SimBot) -> Self {
        Self {
            id: b.id,
            x: b.position.x,
            y: b.position.y,
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
            colors: b.colors.clone(),
        }
    }
}

impl From<&SimBullet> for BulletSnapshot {
    fn from(p: &SimBullet) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            power: p.power,
            x: p.position.x,
            y: p.position.y,
            heading: p.heading,
            speed: p.speed,
            color: p.color.clone(),
        }
    }
}
