use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

/// Hand-off between the bridge worker thread and the game thread hooks.
#[derive(Default)]
pub struct GameLink {
    pending_items: Mutex<VecDeque<i64>>,
    checked_locations: Mutex<Vec<i64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GameLink {
    pub fn push_items(&self, items: impl IntoIterator<Item = i64>) {
        lock(&self.pending_items).extend(items);
    }

    /// Takes at most `max` items so a single frame is not stalled.
    pub fn drain_items(&self, max: usize) -> Vec<i64> {
        let mut pending = lock(&self.pending_items);
        let count = pending.len().min(max);
        pending.drain(..count).collect()
    }

    pub fn pending_item_count(&self) -> usize {
        lock(&self.pending_items).len()
    }

    pub fn push_location(&self, location: i64) {
        let mut checked = lock(&self.checked_locations);
        if !checked.contains(&location) {
            checked.push(location);
        }
    }

    pub fn take_locations(&self) -> Vec<i64> {
        std::mem::take(&mut *lock(&self.checked_locations))
    }

    pub fn restore_locations(&self, locations: Vec<i64>) {
        let mut checked = lock(&self.checked_locations);
        let newer = std::mem::replace(&mut *checked, locations);
        for location in newer {
            if !checked.contains(&location) {
                checked.push(location);
            }
        }
    }
}
