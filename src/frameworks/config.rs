use std::{env, time::Duration};

// Runtime/server configuration (not gameplay rules; those live in
// domain::rules).

pub fn http_port() -> u16 {
    env::var("BOTARENA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7913)
}

/// Target turns per second. Zero means "unbounded".
pub fn tps() -> u32 {
    env::var("BOTARENA_TPS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30)
}

/// The intent-collection window derived from the TPS target. An unbounded
/// rate collapses toward the minimum scheduling quantum.
pub fn turn_interval() -> Duration {
    match tps() {
        0 => MIN_TURN_INTERVAL,
        t => Duration::from_secs_f64(1.0 / t as f64).max(MIN_TURN_INTERVAL),
    }
}

pub fn arena_width() -> u32 {
    env::var("BOTARENA_ARENA_WIDTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|w| *w > 0)
        .unwrap_or(800)
}

pub fn arena_height() -> u32 {
    env::var("BOTARENA_ARENA_HEIGHT")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|h| *h > 0)
        .unwrap_or(600)
}

pub fn rounds() -> u32 {
    env::var("BOTARENA_ROUNDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|r| *r > 0)
        .unwrap_or(10)
}

/// Turn limit per round; zero disables it.
pub fn max_turns() -> u64 {
    env::var("BOTARENA_MAX_TURNS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

pub fn min_participants() -> usize {
    env::var("BOTARENA_MIN_PARTICIPANTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|m| *m >= 2)
        .unwrap_or(2)
}

pub const SESSION_CHANNEL_CAPACITY: usize = 1024;
pub const TURN_BROADCAST_CAPACITY: usize = 128;

pub const MIN_TURN_INTERVAL: Duration = Duration::from_millis(1);
