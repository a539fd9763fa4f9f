// Battle-lifetime score accumulation. A round's tallies collect in a buffer
// and fold into battle totals only when the round completes; a battle
// stopped mid-round discards the unfinished round.

use std::collections::BTreeMap;

use crate::domain::rules;

/// Per-bot score accumulated across completed rounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotScore {
    pub bot_id: u64,
    pub name: String,
    pub bullet_damage: f64,
    pub ram_damage: f64,
    pub survival: f64,
    pub last_survivor_bonus: f64,
}

impl BotScore {
    pub fn total(&self) -> f64 {
        self.bullet_damage * rules::SCORE_PER_BULLET_DAMAGE
            + self.ram_damage * rules::SCORE_PER_RAM_DAMAGE
            + self.survival
            + self.last_survivor_bonus
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RoundEntry {
    bullet_damage: f64,
    ram_damage: f64,
    survival: f64,
    last_survivor_bonus: f64,
}

/// One round's running tallies, kept apart from the battle totals until the
/// round actually ends.
#[derive(Debug, Default)]
pub struct RoundTally {
    entries: BTreeMap<u64, RoundEntry>,
}

impl RoundTally {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, bot_id: u64) -> &mut RoundEntry {
        self.entries.entry(bot_id).or_default()
    }

    pub fn record_bullet_damage(&mut self, owner_id: u64, damage: f64) {
        self.entry(owner_id).bullet_damage += damage;
    }

    pub fn record_ram_damage(&mut self, bot_id: u64, damage: f64) {
        self.entry(bot_id).ram_damage += damage;
    }

    /// Credits every bot that outlived this death.
    pub fn record_death(&mut self, survivors: &[u64]) {
        for id in survivors {
            self.entry(*id).survival += rules::SCORE_PER_SURVIVAL;
        }
    }

    /// Sole-survivor bonus, scaled by the opponents outlasted. A round that
    /// times out with several bots standing has no last survivor and awards
    /// nothing.
    pub fn record_round_end(&mut self, survivors: &[u64], participant_count: usize) {
        if survivors.len() != 1 {
            return;
        }
        let opponents = participant_count.saturating_sub(1) as f64;
        self.entry(survivors[0]).last_survivor_bonus +=
            rules::SCORE_LAST_SURVIVOR_BONUS * opponents;
    }
}

/// Tracks totals for every bot that ever participated in the battle.
/// Mutated only by the battle task, and only at round boundaries.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    entries: BTreeMap<u64, BotScore>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_bot(&mut self, bot_id: u64, name: &str) {
        self.entries.entry(bot_id).or_insert_with(|| BotScore {
            bot_id,
            name: name.to_string(),
            ..BotScore::default()
        });
    }

    /// Folds a completed round into the battle totals.
    pub fn fold_round(&mut self, tally: RoundTally) {
        for (bot_id, round) in tally.entries {
            if let Some(entry) = self.entries.get_mut(&bot_id) {
                entry.bullet_damage += round.bullet_damage;
                entry.ram_damage += round.ram_damage;
                entry.survival += round.survival;
                entry.last_survivor_bonus += round.last_survivor_bonus;
            }
        }
    }

    /// Final standings, best total first; ties broken by bot id.
    pub fn results(&self) -> Vec<BotScore> {
        let mut results: Vec<BotScore> = self.entries.values().cloned().collect();
        results.sort_by(|a, b| {
            b.total()
                .partial_cmp(&a.total())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.bot_id.cmp(&b.bot_id))
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(names: &[(u64, &str)]) -> ScoreBoard {
        let mut board = ScoreBoard::new();
        for (id, name) in names {
            board.ensure_bot(*id, name);
        }
        board
    }

    #[test]
    fn damage_and_bonuses_accumulate_into_the_total() {
        let mut board = board_with(&[(1, "alpha"), (2, "beta")]);
        let mut tally = RoundTally::new();

        tally.record_bullet_damage(1, 10.0);
        tally.record_ram_damage(1, 0.4);
        tally.record_death(&[1]);
        tally.record_round_end(&[1], 2);
        board.fold_round(tally);

        let results = board.results();
        assert_eq!(results[0].bot_id, 1);
        assert_eq!(results[0].total(), 10.0 + 0.8 + 50.0 + 10.0);
        assert_eq!(results[1].total(), 0.0);
    }

    #[test]
    fn unfolded_tallies_never_reach_the_results() {
        let mut board = board_with(&[(1, "alpha")]);
        let mut tally = RoundTally::new();
        tally.record_bullet_damage(1, 10.0);
        tally.record_death(&[1]);

        // The round never completed; its tallies are dropped, not flushed.
        drop(tally);
        assert_eq!(board.results()[0].total(), 0.0);

        let mut completed = RoundTally::new();
        completed.record_bullet_damage(1, 4.0);
        board.fold_round(completed);
        assert_eq!(board.results()[0].total(), 4.0);
    }

    #[test]
    fn timeout_rounds_award_no_survivor_bonus() {
        let mut board = board_with(&[(1, "alpha"), (2, "beta")]);
        let mut tally = RoundTally::new();
        tally.record_round_end(&[1, 2], 2);
        board.fold_round(tally);

        for result in board.results() {
            assert_eq!(result.last_survivor_bonus, 0.0);
        }
    }

    #[test]
    fn scores_survive_multiple_rounds() {
        let mut board = board_with(&[(1, "alpha")]);
        for _ in 0..2 {
            let mut tally = RoundTally::new();
            tally.record_round_end(&[1], 3);
            board.fold_round(tally);
        }

        assert_eq!(board.results()[0].last_survivor_bonus, 40.0);
    }
}
