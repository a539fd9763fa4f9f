// Gameplay constants and formulas. Runtime/server settings live in
// frameworks::config.

pub const INITIAL_ENERGY: f64 = 100.0;
/// Guns start hot so nobody fires on turn one.
pub const INITIAL_GUN_HEAT: f64 = 3.0;
pub const GUN_COOLING_RATE: f64 = 0.1;

pub const MAX_SPEED: f64 = 8.0;
pub const ACCELERATION: f64 = 1.0;
pub const DECELERATION: f64 = 2.0;

/// Body turn rate at standstill, degrees per turn.
pub const MAX_BODY_TURN_RATE: f64 = 10.0;
/// How much each unit of speed erodes the body turn rate.
pub const TURN_RATE_SPEED_FACTOR: f64 = 0.75;
pub const MAX_GUN_TURN_RATE: f64 = 20.0;
pub const MAX_RADAR_TURN_RATE: f64 = 45.0;

pub const MIN_FIREPOWER: f64 = 0.1;
pub const MAX_FIREPOWER: f64 = 3.0;

pub const BOT_BOUNDING_RADIUS: f64 = 18.0;
pub const RADAR_RADIUS: f64 = 1200.0;
pub const RAM_DAMAGE: f64 = 0.4;

pub const SCORE_PER_BULLET_DAMAGE: f64 = 1.0;
pub const SCORE_PER_RAM_DAMAGE: f64 = 2.0;
pub const SCORE_PER_SURVIVAL: f64 = 50.0;
pub const SCORE_LAST_SURVIVOR_BONUS: f64 = 10.0;

/// Attainable body turn rate at the given speed: fast bots turn slower.
pub fn max_turn_rate(speed: f64) -> f64 {
    (MAX_BODY_TURN_RATE - TURN_RATE_SPEED_FACTOR * speed.abs()).max(0.0)
}

/// The same constraint read the other way: the top speed a bot can hold
/// while turning this hard.
pub fn max_speed_for_turn(turn_rate: f64) -> f64 {
    ((MAX_BODY_TURN_RATE - turn_rate.abs()) / TURN_RATE_SPEED_FACTOR).clamp(0.0, MAX_SPEED)
}

/// Heavier shots fly slower.
pub fn bullet_speed(power: f64) -> f64 {
    20.0 - 3.0 * power
}

/// Heat added to the gun by firing; cools by `GUN_COOLING_RATE` per turn.
pub fn gun_heat(power: f64) -> f64 {
    1.0 + power / 5.0
}

/// Damage dealt on impact, with a bonus above power 1.
pub fn bullet_damage(power: f64) -> f64 {
    4.0 * power + 2.0 * (power - 1.0).max(0.0)
}

/// Energy returned to the shooter for landing a hit.
pub fn bullet_hit_energy_gain(power: f64) -> f64 {
    3.0 * power
}

/// Energy lost to a wall impact; gentle contact is free.
pub fn wall_damage(speed: f64) -> f64 {
    (speed.abs() / 2.0 - 1.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_rate_shrinks_with_speed() {
        assert_eq!(max_turn_rate(0.0), 10.0);
        assert_eq!(max_turn_rate(8.0), 4.0);
        assert_eq!(max_turn_rate(-8.0), 4.0);
    }

    fn approx(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn speed_cap_shrinks_with_turn_rate() {
        assert_eq!(max_speed_for_turn(0.0), MAX_SPEED);
        assert_eq!(max_speed_for_turn(4.0), MAX_SPEED);
        approx(max_speed_for_turn(7.0), 4.0);
        assert_eq!(max_speed_for_turn(10.0), 0.0);
        assert_eq!(max_speed_for_turn(45.0), 0.0);
    }

    #[test]
    fn bullet_formulas_match_the_classic_table() {
        approx(bullet_speed(0.1), 19.7);
        approx(bullet_speed(3.0), 11.0);
        approx(gun_heat(3.0), 1.6);
        approx(bullet_damage(1.0), 4.0);
        approx(bullet_damage(3.0), 16.0);
        approx(bullet_hit_energy_gain(2.0), 6.0);
    }

    #[test]
    fn wall_damage_has_a_free_band() {
        assert_eq!(wall_damage(1.0), 0.0);
        assert_eq!(wall_damage(2.0), 0.0);
        approx(wall_damage(8.0), 3.0);
        approx(wall_damage(-8.0), 3.0);
    }
}
