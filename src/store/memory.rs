//! In-process store

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::TimerStore;
use crate::state::TimerState;

/// Stores the state in memory. Clones share one slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<TimerState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `state`
    pub fn with_state(state: TimerState) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(state))),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<TimerState>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear(&self) {
        *self.lock_slot() = None;
    }
}

impl TimerStore for MemoryStore {
    fn load(&self) -> Option<TimerState> {
        (*self.lock_slot()).filter(TimerState::is_consistent)
    }

    fn save(&self, state: &TimerState) {
        *self.lock_slot() = Some(*state);
    }
}
