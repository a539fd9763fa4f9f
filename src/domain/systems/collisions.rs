// Wall and bot-bot collision resolution.

use crate::domain::events::TurnEvent;
use crate::domain::math::{normalize_absolute, normalize_relative};
use crate::domain::rules;
use crate::domain::state::{Arena, SimBot};

/// Stops bots that would cross an arena bound exactly at the bound, zeroing
/// speed and applying speed-dependent wall damage.
pub fn resolve_wall_collisions(arena: &Arena, bots: &mut [SimBot], events: &mut Vec<TurnEvent>) {
    let r = rules::BOT_BOUNDING_RADIUS;
    for bot in bots.iter_mut().filter(|b| b.alive) {
        // Wall normal pointing back into the arena, summed per axis so a
        // corner impact reports the diagonal.
        let (mut nx, mut ny) = (0.0_f64, 0.0_f64);

        if bot.position.x < r {
            bot.position.x = r;
            nx += 1.0;
        } else if bot.position.x > arena.width() - r {
            bot.position.x = arena.width() - r;
            nx -= 1.0;
        }
        if bot.position.y < r {
            bot.position.y = r;
            ny += 1.0;
        } else if bot.position.y > arena.height() - r {
            bot.position.y = arena.height() - r;
            ny -= 1.0;
        }

        if nx != 0.0 || ny != 0.0 {
            let normal = normalize_absolute(ny.atan2(nx).to_degrees());
            let energy_lost = rules::wall_damage(bot.speed);
            bot.energy = (bot.energy - energy_lost).max(0.0);
            bot.speed = 0.0;
            bot.target_speed = 0.0;
            events.push(TurnEvent::WallHit {
                bot_id: bot.id,
                energy_lost,
                bearing: normalize_relative(normal - bot.heading),
            });
        }
    }
}

/// Resolves overlapping bot pairs: both rewind to their pre-integration
/// positions, stop, and take fixed ram damage. One event per pair, lower id
/// first, checked in ascending id order for determinism.
pub fn resolve_bot_collisions(bots: &mut [SimBot], events: &mut Vec<TurnEvent>) {
    let min_distance = 2.0 * rules::BOT_BOUNDING_RADIUS;
    for i in 0..bots.len() {
        for j in (i + 1)..bots.len() {
            if !bots[i].alive || !bots[j].alive {
                continue;
            }
            if bots[i].position.distance(bots[j].position) >= min_distance {
                continue;
            }

            let ids = [bots[i].id, bots[j].id];
            for k in [i, j] {
                let bot = &mut bots[k];
                bot.position = bot.previous_position;
                bot.speed = 0.0;
                bot.target_speed = 0.0;
                bot.energy = (bot.energy - rules::RAM_DAMAGE).max(0.0);
            }
            events.push(TurnEvent::BotHitBot {
                bot_ids: ids,
                damage: rules::RAM_DAMAGE,
            });
        }
    }
}
