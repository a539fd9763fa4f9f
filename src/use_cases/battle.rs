// The authoritative battle loop: turn scheduling, round lifecycle, scoring.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info};

use crate::domain::{Arena, Intent, Point, SimBot, TurnEvent, World, advance};
use crate::use_cases::intents::IntentRegistry;
use crate::use_cases::scoring::{RoundTally, ScoreBoard};
use crate::use_cases::types::{ControlCommand, EngineState, SessionEvent, TurnUpdate};

/// Fixed configuration for one battle.
#[derive(Debug, Clone)]
pub struct BattleSettings {
    pub arena: Arena,
    /// The intent-collection window; one turn advances when it elapses.
    pub turn_interval: Duration,
    /// Rounds per battle.
    pub rounds: u32,
    /// Turn limit per round; zero disables it.
    pub max_turns: u64,
    /// Bots required before a round starts.
    pub min_participants: usize,
}

#[derive(Debug)]
struct Participant {
    name: String,
    connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingBots,
    RoundRunning,
    RoundEnded,
    BattleEnded,
}

/// Drives the battle: one logical scheduler owning the `World`.
///
/// Session tasks only talk to it through `session_rx` and the intent
/// registry; state flows back out through the turn broadcast and the engine
/// state watch. Joins and leaves take effect at round boundaries, never
/// mid-round. Pause is checked at window boundaries only.
pub async fn battle_task(
    mut session_rx: mpsc::Receiver<SessionEvent>,
    intents: Arc<IntentRegistry>,
    turn_tx: broadcast::Sender<TurnUpdate>,
    engine_state_tx: watch::Sender<EngineState>,
    settings: BattleSettings,
) {
    let mut roster: BTreeMap<u64, Participant> = BTreeMap::new();
    let mut scores = ScoreBoard::new();
    // The running round's tallies; folded into `scores` only at round end,
    // so a mid-round stop discards the unfinished round.
    let mut tally = RoundTally::new();
    let mut world = World::new(settings.arena);
    let mut round: u32 = 0;
    let mut phase = Phase::AwaitingBots;
    let mut paused = false;
    let mut start_requested = false;

    let mut interval = tokio::time::interval(settings.turn_interval);
    // A paused battle must not replay the windows it missed on resume.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        // Session events and control commands queued since the last window.
        while let Ok(event) = session_rx.try_recv() {
            match event {
                SessionEvent::BotJoined {
                    bot_id,
                    name,
                    version,
                    author,
                } => {
                    info!(bot_id, name, version, author, "bot joined");
                    scores.ensure_bot(bot_id, &name);
                    roster.insert(
                        bot_id,
                        Participant {
                            name,
                            connected: true,
                        },
                    );
                }
                SessionEvent::BotLeft { bot_id } => {
                    info!(bot_id, "bot left");
                    intents.remove(bot_id);
                    if phase == Phase::AwaitingBots {
                        roster.remove(&bot_id);
                    } else if let Some(p) = roster.get_mut(&bot_id) {
                        // Removal happens at the next round boundary.
                        p.connected = false;
                    }
                }
                SessionEvent::Control { command } => match command {
                    ControlCommand::Start => {
                        debug!("start requested");
                        start_requested = true;
                    }
                    ControlCommand::Pause => {
                        if phase == Phase::RoundRunning && !paused {
                            info!(round, "battle paused");
                            paused = true;
                            let _ = engine_state_tx.send(EngineState::Paused { round });
                        }
                    }
                    ControlCommand::Resume => {
                        if paused {
                            info!(round, "battle resumed");
                            paused = false;
                            let _ = engine_state_tx.send(EngineState::RoundRunning { round });
                        }
                    }
                    ControlCommand::Stop => {
                        if phase != Phase::BattleEnded {
                            info!(round, "battle stopped");
                            phase = Phase::BattleEnded;
                            paused = false;
                            let _ = engine_state_tx.send(EngineState::BattleEnded {
                                results: scores.results(),
                            });
                        }
                    }
                },
            }
        }

        match phase {
            Phase::AwaitingBots => {
                let connected = roster.values().filter(|p| p.connected).count();
                let enough = connected >= settings.min_participants
                    || (start_requested && connected >= 2);
                if enough {
                    start_requested = false;
                    round += 1;
                    tally = RoundTally::new();
                    start_round(&settings, &roster, &mut world, &intents);
                    info!(round, participants = world.bots.len(), "round started");
                    phase = Phase::RoundRunning;
                    let _ = engine_state_tx.send(EngineState::RoundRunning { round });
                }
            }
            Phase::RoundRunning => {
                if paused {
                    continue;
                }

                let commands: BTreeMap<u64, Intent> =
                    intents.consume_all().into_iter().collect();
                let events = advance(&mut world, &commands, settings.max_turns);
                apply_scoring(&mut tally, &events, &world);

                let round_over = events
                    .iter()
                    .any(|e| matches!(e, TurnEvent::RoundEnded { .. }));

                let _ = turn_tx.send(TurnUpdate {
                    round,
                    turn: world.turn,
                    bots: world.bots.iter().map(Into::into).collect(),
                    bullets: world.bullets.iter().map(Into::into).collect(),
                    events,
                });

                if round_over {
                    let survivors: Vec<u64> = world
                        .bots
                        .iter()
                        .filter(|b| b.alive)
                        .map(|b| b.id)
                        .collect();
                    tally.record_round_end(&survivors, world.bots.len());
                    scores.fold_round(std::mem::take(&mut tally));
                    info!(round, turns = world.turn, ?survivors, "round ended");
                    phase = Phase::RoundEnded;
                    let _ = engine_state_tx.send(EngineState::RoundEnded { round });
                }
            }
            Phase::RoundEnded => {
                // Safe boundary: disconnected bots leave the roster here.
                roster.retain(|_, p| p.connected);

                if round >= settings.rounds {
                    info!(rounds = round, "battle ended");
                    phase = Phase::BattleEnded;
                    let _ = engine_state_tx.send(EngineState::BattleEnded {
                        results: scores.results(),
                    });
                } else if roster.len() >= settings.min_participants {
                    round += 1;
                    tally = RoundTally::new();
                    start_round(&settings, &roster, &mut world, &intents);
                    info!(round, participants = world.bots.len(), "round started");
                    phase = Phase::RoundRunning;
                    let _ = engine_state_tx.send(EngineState::RoundRunning { round });
                } else {
                    phase = Phase::AwaitingBots;
                    let _ = engine_state_tx.send(EngineState::AwaitingBots);
                }
            }
            // Terminal: keep draining session events so senders never block.
            Phase::BattleEnded => {}
        }
    }
}

/// Places the connected roster on a fresh world, evenly spaced on a grid in
/// id order. Bullet ids carry over so ids are never reused within a battle.
fn start_round(
    settings: &BattleSettings,
    roster: &BTreeMap<u64, Participant>,
    world: &mut World,
    intents: &IntentRegistry,
) {
    let next_bullet_id = world.next_bullet_id;
    *world = World::new(settings.arena);
    world.next_bullet_id = next_bullet_id;

    let ids: Vec<u64> = roster
        .iter()
        .filter(|(_, p)| p.connected)
        .map(|(id, _)| *id)
        .collect();
    let cols = (ids.len() as f64).sqrt().ceil().max(1.0) as usize;
    let rows = ids.len().div_ceil(cols);

    for (i, id) in ids.iter().enumerate() {
        let col = (i % cols) as f64;
        let row = (i / cols) as f64;
        let x = settings.arena.width() * (col + 1.0) / (cols as f64 + 1.0);
        let y = settings.arena.height() * (row + 1.0) / (rows as f64 + 1.0);
        world.bots.push(SimBot::placed(*id, Point::new(x, y), 0.0));
    }

    // Intents submitted before placement belong to no turn of this round.
    let _ = intents.consume_all();
}

/// Folds one turn's events into the running round tally.
fn apply_scoring(tally: &mut RoundTally, events: &[TurnEvent], world: &World) {
    for event in events {
        match event {
            TurnEvent::BulletHitBot {
                owner_id, damage, ..
            } => tally.record_bullet_damage(*owner_id, *damage),
            TurnEvent::BotHitBot { bot_ids, damage } => {
                for id in bot_ids {
                    tally.record_ram_damage(*id, *damage);
                }
            }
            TurnEvent::BotDeath { .. } => {
                let survivors: Vec<u64> = world
                    .bots
                    .iter()
                    .filter(|b| b.alive)
                    .map(|b| b.id)
                    .collect();
                tally.record_death(&survivors);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    fn settings() -> BattleSettings {
        BattleSettings {
            arena: Arena::new(800, 600),
            turn_interval: Duration::from_millis(1),
            rounds: 1,
            max_turns: 20,
            min_participants: 2,
        }
    }

    fn spawn_battle() -> (
        mpsc::Sender<SessionEvent>,
        broadcast::Receiver<TurnUpdate>,
        watch::Receiver<EngineState>,
    ) {
        let (session_tx, session_rx) = mpsc::channel(64);
        let (turn_tx, turn_rx) = broadcast::channel(64);
        let (engine_state_tx, engine_state_rx) = watch::channel(EngineState::AwaitingBots);
        tokio::spawn(battle_task(
            session_rx,
            Arc::new(IntentRegistry::new()),
            turn_tx,
            engine_state_tx,
            settings(),
        ));
        (session_tx, turn_rx, engine_state_rx)
    }

    fn join(bot_id: u64) -> SessionEvent {
        SessionEvent::BotJoined {
            bot_id,
            name: format!("bot-{bot_id}"),
            version: "1.0".into(),
            author: "test".into(),
        }
    }

    #[tokio::test]
    async fn battle_starts_once_enough_bots_join() {
        let (session_tx, mut turn_rx, _state_rx) = spawn_battle();
        session_tx.send(join(1)).await.expect("send");
        session_tx.send(join(2)).await.expect("send");

        let update = timeout(Duration::from_secs(2), turn_rx.recv())
            .await
            .expect("turn within deadline")
            .expect("broadcast open");
        assert_eq!(update.round, 1);
        assert_eq!(update.bots.len(), 2);
    }

    #[tokio::test]
    async fn battle_runs_to_the_turn_limit_and_ends() {
        let (session_tx, _turn_rx, mut state_rx) = spawn_battle();
        session_tx.send(join(1)).await.expect("send");
        session_tx.send(join(2)).await.expect("send");

        let ended = timeout(Duration::from_secs(5), async {
            loop {
                state_rx.changed().await.expect("watch open");
                if let EngineState::BattleEnded { results } = &*state_rx.borrow() {
                    break results.len();
                }
            }
        })
        .await
        .expect("battle ends within deadline");
        assert_eq!(ended, 2);
    }

    #[tokio::test]
    async fn pause_freezes_turn_advancement() {
        let (session_tx, mut turn_rx, _state_rx) = spawn_battle();
        session_tx.send(join(1)).await.expect("send");
        session_tx.send(join(2)).await.expect("send");

        // Let the battle start, then pause it.
        let _ = timeout(Duration::from_secs(2), turn_rx.recv())
            .await
            .expect("turn within deadline");
        session_tx
            .send(SessionEvent::Control {
                command: ControlCommand::Pause,
            })
            .await
            .expect("send");

        // Drain whatever was in flight, then expect silence.
        tokio::time::sleep(Duration::from_millis(50)).await;
        while turn_rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(turn_rx.try_recv().is_err());

        // Resume picks the battle back up.
        session_tx
            .send(SessionEvent::Control {
                command: ControlCommand::Resume,
            })
            .await
            .expect("send");
        let update = timeout(Duration::from_secs(2), turn_rx.recv())
            .await
            .expect("turn within deadline")
            .expect("broadcast open");
        assert_eq!(update.round, 1);
    }

    #[tokio::test]
    async fn stop_forces_battle_end() {
        let (session_tx, _turn_rx, mut state_rx) = spawn_battle();
        session_tx.send(join(1)).await.expect("send");
        session_tx.send(join(2)).await.expect("send");
        session_tx
            .send(SessionEvent::Control {
                command: ControlCommand::Stop,
            })
            .await
            .expect("send");

        timeout(Duration::from_secs(2), async {
            loop {
                state_rx.changed().await.expect("watch open");
                if matches!(&*state_rx.borrow(), EngineState::BattleEnded { .. }) {
                    break;
                }
            }
        })
        .await
        .expect("stop ends the battle");
    }
}
