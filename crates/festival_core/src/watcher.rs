use std::collections::HashMap;

use crate::performance::{Performance, PerformanceId, PerformanceStatus};
use crate::scheduler::StatusAlert;

/// A favorited performance that just became unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: PerformanceId,
    pub previous: PerformanceStatus,
    pub current: PerformanceStatus,
    pub alert: StatusAlert,
}

/// Remembers the statuses of the last complete snapshot.
#[derive(Debug, Default)]
pub struct StatusWatcher {
    previous: Option<HashMap<PerformanceId, PerformanceStatus>>,
}

impl StatusWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Compares `snapshot` with the previous one for every favorited id present
    /// in both, then keeps `snapshot` as the new baseline. The first snapshot
    /// only establishes the baseline.
    pub fn observe(
        &mut self,
        snapshot: &[Performance],
        is_favorite: impl Fn(&PerformanceId) -> bool,
    ) -> Vec<StatusChange> {
        let current: HashMap<PerformanceId, PerformanceStatus> = snapshot
            .iter()
            .map(|performance| (performance.id.clone(), performance.status))
            .collect();

        let mut changes = Vec::new();
        if let Some(previous) = &self.previous {
            for performance in snapshot {
                if !is_favorite(&performance.id) {
                    continue;
                }
                let Some(&before) = previous.get(&performance.id) else {
                    continue;
                };
                let after = performance.status;
                if before == after {
                    continue;
                }
                if let Some(alert) = StatusAlert::for_status(after) {
                    changes.push(StatusChange {
                        id: performance.id.clone(),
                        previous: before,
                        current: after,
                        alert,
                    });
                }
            }
        }

        self.previous = Some(current);
        changes
    }
}
