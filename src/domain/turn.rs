// The deterministic per-turn step: applies consumed intents to the world in
// a fixed order so identical inputs always produce identical outputs.

use std::collections::BTreeMap;

use super::events::TurnEvent;
use super::rules;
use super::state::{Arena, Intent, SimBot, SimBullet};
use super::systems::{bullets, collisions, movement, scanning};

/// All simulation state for one round. Owned exclusively by the battle task;
/// sessions only ever see snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub arena: Arena,
    pub bots: Vec<SimBot>,
    pub bullets: Vec<SimBullet>,
    pub next_bullet_id: u64,
    pub turn: u64,
}

impl World {
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            bots: Vec::new(),
            bullets: Vec::new(),
            next_bullet_id: 1,
            turn: 0,
        }
    }

    pub fn live_bot_count(&self) -> usize {
        self.bots.iter().filter(|b| b.alive).count()
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Advances the world by exactly one turn.
///
/// Bots without an entry in `commands` coast and receive a skipped-turn
/// event. `max_turns` of zero disables the round turn limit. Bots are
/// processed in ascending id order throughout (the caller keeps `bots`
/// sorted by id), which together with `BTreeMap` iteration makes the whole
/// step reproducible.
pub fn advance(
    world: &mut World,
    commands: &BTreeMap<u64, Intent>,
    max_turns: u64,
) -> Vec<TurnEvent> {
    let mut events = Vec::new();
    let mut sweeps: BTreeMap<u64, scanning::RadarSweep> = BTreeMap::new();
    world.turn += 1;

    for bot in world.bots.iter_mut().filter(|b| b.alive) {
        // (1) Gun cooldown.
        bot.gun_heat = (bot.gun_heat - rules::GUN_COOLING_RATE).max(0.0);

        let mut rescan = false;
        let cmd = match commands.get(&bot.id) {
            Some(intent) => {
                if let Some(adjust) = intent.adjust_gun_for_body_turn {
                    bot.adjust_gun_for_body_turn = adjust;
                }
                if let Some(adjust) = intent.adjust_radar_for_gun_turn {
                    bot.adjust_radar_for_gun_turn = adjust;
                }
                if let Some(colors) = &intent.colors {
                    bot.colors = colors.clone();
                }
                rescan = intent.rescan;
                movement::DriveCommand {
                    target_speed: finite(intent.target_speed).unwrap_or(bot.speed),
                    turn_rate: finite(intent.turn_rate).unwrap_or(0.0),
                    gun_turn_rate: finite(intent.gun_turn_rate).unwrap_or(0.0),
                    radar_turn_rate: finite(intent.radar_turn_rate).unwrap_or(0.0),
                }
            }
            None => {
                events.push(TurnEvent::SkippedTurn { bot_id: bot.id });
                movement::DriveCommand::coast(bot)
            }
        };

        // (2) Rotation, (3) acceleration, (4) position integration.
        let (sweep_start, sweep_delta) = movement::apply_rotation(bot, &cmd);
        sweeps.insert(
            bot.id,
            scanning::RadarSweep {
                start: sweep_start,
                delta: sweep_delta,
                rescan,
            },
        );
        movement::apply_speed(bot, cmd.target_speed);
        movement::integrate(bot);
    }

    // (5) Walls, (6) bot-bot collisions.
    collisions::resolve_wall_collisions(&world.arena, &mut world.bots, &mut events);
    collisions::resolve_bot_collisions(&mut world.bots, &mut events);

    // (7) Bullet flight, (8) bullet collisions.
    bullets::advance_bullets(&mut world.bullets);
    bullets::resolve_bullet_collisions(
        &world.arena,
        &mut world.bots,
        &mut world.bullets,
        &mut events,
    );

    // (9) Firing.
    bullets::process_firing(
        &mut world.bots,
        commands,
        &mut world.bullets,
        &mut world.next_bullet_id,
    );

    // (10) Radar scans.
    scanning::scan_bots(&mut world.bots, &sweeps, &mut events);

    // (11) Deaths. Dead bots keep their last state for events and scoring.
    for bot in world.bots.iter_mut().filter(|b| b.alive && b.energy <= 0.0) {
        bot.alive = false;
        events.push(TurnEvent::BotDeath { bot_id: bot.id });
    }

    // (12) Round-end detection.
    let survivor_ids: Vec<u64> = world
        .bots
        .iter()
        .filter(|b| b.alive)
        .map(|b| b.id)
        .collect();
    if survivor_ids.len() <= 1 || (max_turns > 0 && world.turn >= max_turns) {
        events.push(TurnEvent::RoundEnded { survivor_ids });
    }

    events
}
