// Bullet ballistics: advancing, collision resolution and firing.

use std::collections::{BTreeMap, HashSet};

use crate::domain::events::TurnEvent;
use crate::domain::math::{direction, segment_point_distance, segments_intersect};
use crate::domain::rules;
use crate::domain::state::{Arena, Intent, SimBot, SimBullet};

/// Moves every bullet one turn along its heading at its fixed speed.
pub fn advance_bullets(bullets: &mut [SimBullet]) {
    for bullet in bullets.iter_mut() {
        bullet.previous_position = bullet.position;
        let (dx, dy) = direction(bullet.heading);
        bullet.position.x += dx * bullet.speed;
        bullet.position.y += dy * bullet.speed;
    }
}

/// Resolves bullet collisions for this turn in fixed priority order:
/// bullet-bot, then bullet-bullet, then bullet-wall. Bullet paths are swept
/// segments from their previous to their new position.
pub fn resolve_bullet_collisions(
    arena: &Arena,
    bots: &mut [SimBot],
    bullets: &mut Vec<SimBullet>,
    events: &mut Vec<TurnEvent>,
) {
    let mut destroyed: HashSet<u64> = HashSet::new();

    // Bullet-bot, highest priority. A bullet never hits its own owner.
    for bullet in bullets.iter() {
        for bot in bots.iter_mut().filter(|b| b.alive && b.id != bullet.owner_id) {
            if segment_point_distance(bullet.previous_position, bullet.position, bot.position)
                > rules::BOT_BOUNDING_RADIUS
            {
                continue;
            }

            let damage = rules::bullet_damage(bullet.power);
            bot.energy = (bot.energy - damage).max(0.0);
            events.push(TurnEvent::BulletHitBot {
                bullet_id: bullet.id,
                owner_id: bullet.owner_id,
                victim_id: bot.id,
                damage,
                victim_energy: bot.energy,
            });
            destroyed.insert(bullet.id);
            break;
        }

        if destroyed.contains(&bullet.id) {
            // Energy returned to the owner for landing the shot.
            if let Some(owner) = bots
                .iter_mut()
                .find(|b| b.alive && b.id == bullet.owner_id)
            {
                owner.energy += rules::bullet_hit_energy_gain(bullet.power);
            }
        }
    }

    // Bullet-bullet among the survivors.
    for i in 0..bullets.len() {
        if destroyed.contains(&bullets[i].id) {
            continue;
        }
        for j in (i + 1)..bullets.len() {
            if destroyed.contains(&bullets[j].id) {
                continue;
            }
            if segments_intersect(
                bullets[i].previous_position,
                bullets[i].position,
                bullets[j].previous_position,
                bullets[j].position,
            ) {
                events.push(TurnEvent::BulletHitBullet {
                    bullet_ids: [bullets[i].id, bullets[j].id],
                });
                destroyed.insert(bullets[i].id);
                destroyed.insert(bullets[j].id);
                break;
            }
        }
    }

    // Bullet-wall, lowest priority.
    for bullet in bullets.iter() {
        if !destroyed.contains(&bullet.id) && !arena.contains(bullet.position) {
            events.push(TurnEvent::BulletHitWall { bullet_id: bullet.id });
            destroyed.insert(bullet.id);
        }
    }

    bullets.retain(|b| !destroyed.contains(&b.id));
}

/// Processes firing requests in ascending bot id order. Firing is valid only
/// with a cold gun and enough energy; invalid requests are silent no-ops.
pub fn process_firing(
    bots: &mut [SimBot],
    commands: &BTreeMap<u64, Intent>,
    bullets: &mut Vec<SimBullet>,
    next_bullet_id: &mut u64,
) {
    for bot in bots.iter_mut().filter(|b| b.alive) {
        let Some(power) = commands.get(&bot.id).and_then(|i| i.firepower) else {
            continue;
        };
        if !power.is_finite() {
            continue;
        }
        let power = power.clamp(rules::MIN_FIREPOWER, rules::MAX_FIREPOWER);
        if bot.gun_heat > 0.0 || bot.energy < power {
            continue;
        }

        bot.energy -= power;
        bot.gun_heat = rules::gun_heat(power);
        bullets.push(SimBullet {
            id: *next_bullet_id,
            owner_id: bot.id,
            power,
            position: bot.position,
            heading: bot.gun_heading,
            speed: rules::bullet_speed(power),
            color: bot.colors.bullet.clone(),
            previous_position: bot.position,
        });
        *next_bullet_id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Point;

    fn intent_firing(power: f64) -> Intent {
        Intent {
            firepower: Some(power),
            ..Intent::default()
        }
    }

    #[test]
    fn firing_deducts_energy_and_heats_the_gun() {
        let mut bot = SimBot::placed(1, Point::new(100.0, 100.0), 0.0);
        bot.energy = 50.0;
        bot.gun_heat = 0.0;
        let mut bots = vec![bot];
        let mut bullets = Vec::new();
        let mut next_id = 1;
        let commands = BTreeMap::from([(1, intent_firing(3.0))]);

        process_firing(&mut bots, &commands, &mut bullets, &mut next_id);

        assert_eq!(bots[0].energy, 47.0);
        assert_eq!(bots[0].gun_heat, 1.6);
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].power, 3.0);
        assert_eq!(bullets[0].heading, bots[0].gun_heading);
    }

    #[test]
    fn firing_with_a_hot_gun_is_a_silent_no_op() {
        let mut bot = SimBot::placed(1, Point::new(100.0, 100.0), 0.0);
        bot.gun_heat = 0.5;
        let energy = bot.energy;
        let mut bots = vec![bot];
        let mut bullets = Vec::new();
        let mut next_id = 1;
        let commands = BTreeMap::from([(1, intent_firing(1.0))]);

        process_firing(&mut bots, &commands, &mut bullets, &mut next_id);

        assert!(bullets.is_empty());
        assert_eq!(bots[0].energy, energy);
        assert_eq!(bots[0].gun_heat, 0.5);
    }

    #[test]
    fn firing_without_energy_is_a_silent_no_op() {
        let mut bot = SimBot::placed(1, Point::new(100.0, 100.0), 0.0);
        bot.gun_heat = 0.0;
        bot.energy = 0.5;
        let mut bots = vec![bot];
        let mut bullets = Vec::new();
        let mut next_id = 1;
        let commands = BTreeMap::from([(1, intent_firing(1.0))]);

        process_firing(&mut bots, &commands, &mut bullets, &mut next_id);

        assert!(bullets.is_empty());
        assert_eq!(bots[0].energy, 0.5);
    }

    #[test]
    fn bullet_hit_damages_victim_and_refunds_owner() {
        let shooter = SimBot::placed(1, Point::new(0.0, 0.0), 0.0);
        let victim = SimBot::placed(2, Point::new(100.0, 0.0), 0.0);
        let mut bots = vec![shooter, victim];
        let mut bullets = vec![SimBullet {
            id: 7,
            owner_id: 1,
            power: 2.0,
            position: Point::new(95.0, 0.0),
            heading: 0.0,
            speed: rules::bullet_speed(2.0),
            color: None,
            previous_position: Point::new(81.0, 0.0),
        }];
        let mut events = Vec::new();

        resolve_bullet_collisions(&Arena::new(800, 600), &mut bots, &mut bullets, &mut events);

        assert!(bullets.is_empty());
        let damage = rules::bullet_damage(2.0);
        assert_eq!(bots[1].energy, rules::INITIAL_ENERGY - damage);
        assert_eq!(
            bots[0].energy,
            rules::INITIAL_ENERGY + rules::bullet_hit_energy_gain(2.0)
        );
        assert!(matches!(
            events[0],
            TurnEvent::BulletHitBot { bullet_id: 7, owner_id: 1, victim_id: 2, .. }
        ));
    }

    #[test]
    fn bullet_hitting_a_bot_outranks_a_bullet_crossing() {
        let shooter = SimBot::placed(1, Point::new(0.0, 0.0), 0.0);
        let victim = SimBot::placed(2, Point::new(100.0, 0.0), 0.0);
        let mut bots = vec![shooter, victim];
        let mut bullets = vec![
            // Passes straight through the victim's bounding circle.
            SimBullet {
                id: 1,
                owner_id: 1,
                power: 2.0,
                position: Point::new(110.0, 0.0),
                heading: 0.0,
                speed: 14.0,
                color: None,
                previous_position: Point::new(96.0, 0.0),
            },
            // The victim's own return fire crosses that path this same turn
            // but cannot hit its owner.
            SimBullet {
                id: 2,
                owner_id: 2,
                power: 1.0,
                position: Point::new(100.0, 0.0),
                heading: 270.0,
                speed: 17.0,
                color: None,
                previous_position: Point::new(100.0, 17.0),
            },
        ];
        let mut events = Vec::new();

        resolve_bullet_collisions(&Arena::new(800, 600), &mut bots, &mut bullets, &mut events);

        // Bullet 1 satisfies both collision classes; only the higher
        // priority bullet-bot hit fires, and bullet 2 flies on.
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].id, 2);
        assert!(events.iter().any(|e| matches!(
            e,
            TurnEvent::BulletHitBot { bullet_id: 1, victim_id: 2, .. }
        )));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, TurnEvent::BulletHitBullet { .. }))
        );
    }

    #[test]
    fn crossing_bullets_destroy_each_other() {
        let mut bots = Vec::new();
        let mut bullets = vec![
            SimBullet {
                id: 1,
                owner_id: 1,
                power: 1.0,
                position: Point::new(110.0, 100.0),
                heading: 0.0,
                speed: 17.0,
                color: None,
                previous_position: Point::new(90.0, 100.0),
            },
            SimBullet {
                id: 2,
                owner_id: 2,
                power: 1.0,
                position: Point::new(100.0, 110.0),
                heading: 90.0,
                speed: 17.0,
                color: None,
                previous_position: Point::new(100.0, 90.0),
            },
        ];
        let mut events = Vec::new();

        resolve_bullet_collisions(&Arena::new(800, 600), &mut bots, &mut bullets, &mut events);

        assert!(bullets.is_empty());
        assert!(matches!(
            events[0],
            TurnEvent::BulletHitBullet { bullet_ids: [1, 2] }
        ));
    }

    #[test]
    fn bullets_leaving_the_arena_are_destroyed() {
        let mut bots = Vec::new();
        let mut bullets = vec![SimBullet {
            id: 1,
            owner_id: 1,
            power: 1.0,
            position: Point::new(810.0, 100.0),
            heading: 0.0,
            speed: 17.0,
            color: None,
            previous_position: Point::new(793.0, 100.0),
        }];
        let mut events = Vec::new();

        resolve_bullet_collisions(&Arena::new(800, 600), &mut bots, &mut bullets, &mut events);

        assert!(bullets.is_empty());
        assert!(matches!(events[0], TurnEvent::BulletHitWall { bullet_id: 1 }));
    }
}
