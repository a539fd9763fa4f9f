// Events produced by a single simulation turn.

use super::state::BotSnapshot;

/// Everything noteworthy that happened during one `advance` step, in the
/// order it was resolved. Scan events are private to the scanning bot; the
/// session layer filters them before fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// A bot drove into an arena wall and stopped at the bound.
    WallHit {
        bot_id: u64,
        /// Energy lost to the impact (zero below the damage threshold).
        energy_lost: f64,
        /// Bearing from the bot's heading to the wall normal, in (-180, 180].
        bearing: f64,
    },
    /// Two bots collided; both took ram damage and stopped.
    BotHitBot { bot_ids: [u64; 2], damage: f64 },
    /// A bullet struck a bot.
    BulletHitBot {
        bullet_id: u64,
        owner_id: u64,
        victim_id: u64,
        damage: f64,
        /// Victim energy after the hit.
        victim_energy: f64,
    },
    /// Two bullets collided mid-air; both were destroyed.
    BulletHitBullet { bullet_ids: [u64; 2] },
    /// A bullet left the arena.
    BulletHitWall { bullet_id: u64 },
    /// A bot's energy reached zero.
    BotDeath { bot_id: u64 },
    /// A radar sweep detected another bot. Delivered to the scanner only.
    ScannedBot { scanned_by: u64, bot: BotSnapshot },
    /// A bot submitted no intent before the turn window closed.
    SkippedTurn { bot_id: u64 },
    /// The round-end condition was reached this turn.
    RoundEnded { survivor_ids: Vec<u64> },
}
