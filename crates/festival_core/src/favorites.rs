use std::collections::BTreeSet;
use std::sync::Arc;

use crate::performance::PerformanceId;
use crate::storage::{load_json, save_json, KeyValueStore, FAVORITES_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

/// The user's favorited performance ids. Every mutation is written to the
/// durable store before the call returns.
pub struct FavoriteStore {
    store: Arc<dyn KeyValueStore>,
    ids: BTreeSet<PerformanceId>,
}

impl FavoriteStore {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let ids: BTreeSet<PerformanceId> = load_json(store.as_ref(), FAVORITES_KEY);
        tracing::debug!(count = ids.len(), "favorites loaded");
        Self { store, ids }
    }

    pub fn is_favorite(&self, id: &PerformanceId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &PerformanceId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn toggle(&mut self, id: &PerformanceId) -> FavoriteToggle {
        let change = if self.ids.remove(id) {
            FavoriteToggle::Removed
        } else {
            self.ids.insert(id.clone());
            FavoriteToggle::Added
        };
        self.persist();
        change
    }

    /// Evicts every id in `ids`, returning those that were actually present.
    pub fn remove_many<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a PerformanceId>,
    ) -> Vec<PerformanceId> {
        let removed: Vec<PerformanceId> = ids
            .into_iter()
            .filter(|id| self.ids.remove(*id))
            .cloned()
            .collect();
        if !removed.is_empty() {
            self.persist();
        }
        removed
    }

    fn persist(&self) {
        if let Err(err) = save_json(self.store.as_ref(), FAVORITES_KEY, &self.ids) {
            tracing::error!(%err, "failed to persist favorites");
        }
    }
}
