use std::collections::HashMap;

use crate::notifications::TimerHandle;
use crate::performance::PerformanceId;

/// In-process reminder timers, at most one per performance.
#[derive(Debug, Default)]
pub struct TimerTable {
    timers: HashMap<PerformanceId, TimerHandle>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handle` for `id`, cancelling whatever was there first.
    pub fn cancel_and_replace(&mut self, id: PerformanceId, handle: TimerHandle) {
        if let Some(mut previous) = self.timers.insert(id, handle) {
            previous.cancel();
        }
    }

    /// Returns whether a timer was registered for `id`.
    pub fn cancel(&mut self, id: &PerformanceId) -> bool {
        match self.timers.remove(id) {
            Some(mut handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        for (_, mut handle) in self.timers.drain() {
            handle.cancel();
        }
        count
    }

    /// Drops entries whose timer already fired.
    pub fn prune_fired(&mut self) {
        self.timers.retain(|_, handle| handle.is_active());
    }

    pub fn is_active(&self, id: &PerformanceId) -> bool {
        self.timers
            .get(id)
            .map(TimerHandle::is_active)
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.timers.values().filter(|handle| handle.is_active()).count()
    }
}
