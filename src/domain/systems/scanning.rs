// Radar sweeps: detecting other bots inside the arc swept this turn.

use std::collections::BTreeMap;

use crate::domain::events::TurnEvent;
use crate::domain::math::{angle_in_sweep, bearing};
use crate::domain::rules;
use crate::domain::state::{BotSnapshot, SimBot};

/// The radar arc a bot swept this turn plus its rescan request.
#[derive(Debug, Clone, Copy)]
pub struct RadarSweep {
    pub start: f64,
    pub delta: f64,
    pub rescan: bool,
}

/// Emits a scan event to each scanning bot for every other live bot inside
/// its swept radar arc and range.
///
/// A zero-degree sweep scans nothing unless `rescan` is set, in which case
/// the previous turn's arc is swept again.
pub fn scan_bots(
    bots: &mut [SimBot],
    sweeps: &BTreeMap<u64, RadarSweep>,
    events: &mut Vec<TurnEvent>,
) {
    // Snapshot first: scan results reflect this turn's settled positions.
    let visible: Vec<BotSnapshot> = bots
        .iter()
        .filter(|b| b.alive)
        .map(BotSnapshot::from)
        .collect();

    for scanner in bots.iter_mut().filter(|b| b.alive) {
        let Some(sweep) = sweeps.get(&scanner.id) else {
            continue;
        };

        let (start, delta) = if sweep.delta != 0.0 {
            scanner.last_radar_sweep = (sweep.start, sweep.delta);
            (sweep.start, sweep.delta)
        } else if sweep.rescan {
            scanner.last_radar_sweep
        } else {
            continue;
        };

        for other in visible.iter().filter(|s| s.id != scanner.id) {
            let target = crate::domain::state::Point::new(other.x, other.y);
            if scanner.position.distance(target) > rules::RADAR_RADIUS {
                continue;
            }
            if angle_in_sweep(bearing(scanner.position, target), start, delta) {
                events.push(TurnEvent::ScannedBot {
                    scanned_by: scanner.id,
                    bot: other.clone(),
                });
            }
        }
    }
}
