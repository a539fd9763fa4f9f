// Per-turn kinematics: rotation, acceleration and position integration.

use crate::domain::math::{direction, normalize_absolute};
use crate::domain::rules;
use crate::domain::state::SimBot;

/// Movement portion of a bot's intent, resolved against coast defaults.
#[derive(Debug, Clone, Copy)]
pub struct DriveCommand {
    pub target_speed: f64,
    pub turn_rate: f64,
    pub gun_turn_rate: f64,
    pub radar_turn_rate: f64,
}

impl DriveCommand {
    /// What a bot does with no intent this turn: hold speed, stop turning.
    pub fn coast(bot: &SimBot) -> Self {
        Self {
            target_speed: bot.speed,
            turn_rate: 0.0,
            gun_turn_rate: 0.0,
            radar_turn_rate: 0.0,
        }
    }
}

/// Applies body/gun/radar rotation for one turn and returns the radar sweep
/// as (start heading, signed delta degrees).
///
/// The gun inherits the body's turn and the radar inherits the gun's total
/// turn unless the respective adjust flag decouples them.
pub fn apply_rotation(bot: &mut SimBot, cmd: &DriveCommand) -> (f64, f64) {
    let body_max = rules::max_turn_rate(bot.speed);
    let body_turn = cmd.turn_rate.clamp(-body_max, body_max);
    bot.turn_rate = body_turn;
    bot.heading = normalize_absolute(bot.heading + body_turn);

    let gun_turn = cmd
        .gun_turn_rate
        .clamp(-rules::MAX_GUN_TURN_RATE, rules::MAX_GUN_TURN_RATE);
    bot.gun_turn_rate = gun_turn;
    let gun_delta = gun_turn
        + if bot.adjust_gun_for_body_turn {
            0.0
        } else {
            body_turn
        };
    bot.gun_heading = normalize_absolute(bot.gun_heading + gun_delta);

    let radar_turn = cmd
        .radar_turn_rate
        .clamp(-rules::MAX_RADAR_TURN_RATE, rules::MAX_RADAR_TURN_RATE);
    bot.radar_turn_rate = radar_turn;
    let radar_delta = radar_turn
        + if bot.adjust_radar_for_gun_turn {
            0.0
        } else {
            gun_delta
        };
    let sweep_start = bot.radar_heading;
    bot.radar_heading = normalize_absolute(bot.radar_heading + radar_delta);

    (sweep_start, radar_delta)
}

/// Moves the bot's speed one turn toward the target, bounded by the
/// acceleration/deceleration rates and the turn-derated top speed.
pub fn apply_speed(bot: &mut SimBot, target_speed: f64) {
    let cap = rules::max_speed_for_turn(bot.turn_rate);
    let target = target_speed.clamp(-cap, cap);
    bot.target_speed = target;
    bot.speed = next_speed(bot.speed, target);
}

/// One turn of acceleration toward `target`. Braking is faster than
/// accelerating; crossing zero uses the braking rate until the sign flips.
pub fn next_speed(speed: f64, target: f64) -> f64 {
    if target > speed {
        let step = if speed < 0.0 {
            rules::DECELERATION
        } else {
            rules::ACCELERATION
        };
        (speed + step).min(target)
    } else if target < speed {
        let step = if speed > 0.0 {
            rules::DECELERATION
        } else {
            rules::ACCELERATION
        };
        (speed - step).max(target)
    } else {
        target
    }
}

/// Integrates the new position from speed and heading, remembering the old
/// position for collision rewind.
pub fn integrate(bot: &mut SimBot) {
    bot.previous_position = bot.position;
    let (dx, dy) = direction(bot.heading);
    bot.position.x += dx * bot.speed;
    bot.position.y += dy * bot.speed;
}
