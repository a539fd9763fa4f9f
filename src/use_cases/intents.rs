// Latest-intent store shared between session tasks and the battle loop.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::Intent;

/// Holds at most one pending intent per bot.
///
/// Sessions overwrite concurrently via [`submit`]; the battle task calls
/// [`consume_all`] exactly once per turn and gets a snapshot-consistent map.
/// Submissions racing a consume land in the next snapshot, never in both and
/// never nowhere.
///
/// [`submit`]: IntentRegistry::submit
/// [`consume_all`]: IntentRegistry::consume_all
#[derive(Debug, Default)]
pub struct IntentRegistry {
    // No await ever happens under this lock; a std mutex keeps it cheap.
    pending: Mutex<HashMap<u64, Intent>>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the bot's intent for the next turn, replacing any prior one.
    pub fn submit(&self, bot_id: u64, intent: Intent) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.insert(bot_id, intent);
    }

    /// Atomically takes every pending intent, leaving the registry empty.
    pub fn consume_all(&self) -> HashMap<u64, Intent> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *pending)
    }

    /// Drops a departed bot's pending intent, if any.
    pub fn remove(&self, bot_id: u64) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(&bot_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_submission_wins() {
        let registry = IntentRegistry::new();
        registry.submit(
            1,
            Intent {
                target_speed: Some(3.0),
                ..Intent::default()
            },
        );
        registry.submit(
            1,
            Intent {
                target_speed: Some(8.0),
                ..Intent::default()
            },
        );

        let consumed = registry.consume_all();
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[&1].target_speed, Some(8.0));
    }

    #[test]
    fn second_consume_without_submit_is_empty() {
        let registry = IntentRegistry::new();
        registry.submit(1, Intent::default());

        assert_eq!(registry.consume_all().len(), 1);
        assert!(registry.consume_all().is_empty());
    }

    #[test]
    fn submissions_after_consume_apply_to_the_next_snapshot() {
        let registry = IntentRegistry::new();
        registry.submit(1, Intent::default());
        let first = registry.consume_all();
        registry.submit(2, Intent::default());
        let second = registry.consume_all();

        assert!(first.contains_key(&1));
        assert!(!first.contains_key(&2));
        assert!(second.contains_key(&2));
    }

    #[test]
    fn remove_discards_pending_intent() {
        let registry = IntentRegistry::new();
        registry.submit(1, Intent::default());
        registry.remove(1);
        assert!(registry.consume_all().is_empty());
    }
}
