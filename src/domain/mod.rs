// Domain layer: core simulation types and rules.

pub mod events;
pub mod math;
pub mod rules;
pub mod state;
pub mod systems;
pub mod turn;

pub use events::TurnEvent;
pub use state::{Arena, BotColors, BotSnapshot, BulletSnapshot, Intent, Point, SimBot, SimBullet};
pub use turn::{World, advance};
