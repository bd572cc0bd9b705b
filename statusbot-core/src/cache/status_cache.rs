// File: src/cache/status_cache.rs

use parking_lot::Mutex;
use statusbot_common::models::StatusSnapshot;

/// Holds the most recent successful status reading. Capacity of one.
#[derive(Debug, Default)]
pub struct StatusCache {
    slot: Mutex<Option<StatusSnapshot>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<StatusSnapshot> {
        *self.slot.lock()
    }

    /// Stores `new` unconditionally and reports whether the player count moved.
    /// An empty slot always counts as a change.
    pub fn compare_and_set(&self, new: StatusSnapshot) -> bool {
        let mut slot = self.slot.lock();
        let changed = match *slot {
            Some(prev) => prev.current_players != new.current_players,
            None => true,
        };
        *slot = Some(new);
        changed
    }
}
