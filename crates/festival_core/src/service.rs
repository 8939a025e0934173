use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Duration;
use tracing::instrument;

use crate::backend::NoopBackend;
use crate::curated::{CuratedDispatcher, CuratedNotification, CuratedReport};
use crate::favorites::{FavoriteStore, FavoriteToggle};
use crate::messages::Language;
use crate::notifications::{Clock, NotificationBackend, SystemClock};
use crate::performance::{Performance, PerformanceId};
use crate::permission::{LogPromptSurface, PermissionGate, PermissionState, PromptChoice, PromptSurface};
use crate::scheduler::{NotificationScheduler, ScheduleOutcome, DEFAULT_REMINDER_LEAD_MINUTES};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::watcher::{StatusChange, StatusWatcher};

/// What one refresh cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub performances: usize,
    pub status_changes: Vec<StatusChange>,
    pub evicted: Vec<PerformanceId>,
    pub reminders_scheduled: usize,
    pub reminders_deferred: usize,
}

/// Application state for favorites and reminders. Owns every collaborator and
/// is driven by discrete events: user toggles, refresh ticks, prompt answers.
pub struct FestivalService {
    backend: Arc<dyn NotificationBackend>,
    favorites: FavoriteStore,
    scheduler: NotificationScheduler,
    watcher: StatusWatcher,
    gate: PermissionGate,
    curated: CuratedDispatcher,
    language: Language,
    snapshot: Vec<Performance>,
}

pub struct FestivalServiceBuilder {
    store: Option<Arc<dyn KeyValueStore>>,
    backend: Option<Arc<dyn NotificationBackend>>,
    surface: Option<Arc<dyn PromptSurface>>,
    clock: Option<Arc<dyn Clock>>,
    language: Language,
    reminder_lead: Duration,
}

impl FestivalServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            backend: None,
            surface: None,
            clock: None,
            language: Language::default(),
            reminder_lead: Duration::minutes(DEFAULT_REMINDER_LEAD_MINUTES),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn NotificationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_prompt_surface(mut self, surface: Arc<dyn PromptSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn reminder_lead(mut self, lead: Duration) -> Self {
        self.reminder_lead = lead;
        self
    }

    pub fn build(self) -> Result<FestivalService> {
        if self.reminder_lead <= Duration::zero() {
            bail!(
                "reminder lead must be positive, got {} minutes",
                self.reminder_lead.num_minutes()
            );
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let backend = self.backend.unwrap_or_else(|| Arc::new(NoopBackend));
        let surface = self.surface.unwrap_or_else(|| Arc::new(LogPromptSurface));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let favorites = FavoriteStore::load(store.clone());
        let scheduler = NotificationScheduler::new(backend.clone(), clock.clone(), self.language)
            .with_lead(self.reminder_lead);
        let gate = PermissionGate::new(backend.clone(), surface, store.clone(), self.language);
        let curated = CuratedDispatcher::new(backend.clone(), clock, store);

        tracing::info!(
            backend = backend.name(),
            language = self.language.code(),
            favorites = favorites.len(),
            "festival service ready"
        );

        Ok(FestivalService {
            backend,
            favorites,
            scheduler,
            watcher: StatusWatcher::new(),
            gate,
            curated,
            language: self.language,
            snapshot: Vec::new(),
        })
    }
}

impl Default for FestivalServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FestivalService {
    pub fn builder() -> FestivalServiceBuilder {
        FestivalServiceBuilder::new()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.scheduler.set_language(language);
        self.gate.set_language(language);
    }

    pub fn is_favorite(&self, id: &PerformanceId) -> bool {
        self.favorites.is_favorite(id)
    }

    pub fn favorites(&self) -> Vec<PerformanceId> {
        self.favorites.ids().cloned().collect()
    }

    /// The last complete snapshot passed to [`FestivalService::apply_refresh`].
    pub fn snapshot(&self) -> &[Performance] {
        &self.snapshot
    }

    pub fn performance(&self, id: &PerformanceId) -> Option<&Performance> {
        self.snapshot.iter().find(|performance| &performance.id == id)
    }

    /// Adds or removes `performance`, arming or cancelling its reminder.
    #[instrument(skip_all, fields(id = %performance.id))]
    pub fn toggle_favorite(&mut self, performance: &Performance) -> FavoriteToggle {
        let change = self.favorites.toggle(&performance.id);
        match change {
            FavoriteToggle::Added => {
                let outcome = self.scheduler.schedule_reminder(performance, &mut self.gate);
                tracing::debug!(?outcome, "favorite added");
            }
            FavoriteToggle::Removed => {
                self.scheduler.cancel(&performance.id);
                tracing::debug!("favorite removed");
            }
        }
        self.persist_for_reboot();
        change
    }

    /// Evicts `ids` from the favorites and cancels their reminders. Returns
    /// the ids that were actually favorited.
    pub fn remove_favorites(&mut self, ids: &[PerformanceId]) -> Vec<PerformanceId> {
        let removed = self.favorites.remove_many(ids);
        for id in &removed {
            self.scheduler.cancel(id);
        }
        if !removed.is_empty() {
            self.persist_for_reboot();
        }
        removed
    }

    /// Takes a complete snapshot: announces favorites that became full or
    /// cancelled, evicts them, then re-arms every remaining favorite.
    #[instrument(skip_all, fields(performances = snapshot.len()))]
    pub fn apply_refresh(&mut self, snapshot: Vec<Performance>) -> RefreshReport {
        let favorites = &self.favorites;
        let changes = self
            .watcher
            .observe(&snapshot, |id| favorites.is_favorite(id));

        for change in &changes {
            if let Some(performance) = snapshot.iter().find(|p| p.id == change.id) {
                self.scheduler.notify_status(performance, change.alert);
            }
            tracing::info!(
                id = %change.id,
                previous = change.previous.as_str(),
                current = change.current.as_str(),
                "favorite became unavailable"
            );
        }
        let unavailable: Vec<PerformanceId> = changes.iter().map(|c| c.id.clone()).collect();
        let evicted = self.remove_favorites(&unavailable);

        self.snapshot = snapshot;
        let (reminders_scheduled, reminders_deferred) = self.rearm();

        RefreshReport {
            performances: self.snapshot.len(),
            status_changes: changes,
            evicted,
            reminders_scheduled,
            reminders_deferred,
        }
    }

    /// Bulk permission check run once after startup.
    pub fn preflight_permissions(&mut self) -> PermissionState {
        let state = self.gate.check_exact_alarm();
        tracing::info!(?state, backend = self.backend.name(), "permission preflight");
        state
    }

    #[instrument(skip_all, fields(entries = batch.len()))]
    pub fn process_curated(&mut self, batch: &[CuratedNotification]) -> CuratedReport {
        self.curated.process(batch, &mut self.gate, self.language)
    }

    pub fn is_prompt_open(&self) -> bool {
        self.gate.is_prompt_open()
    }

    /// Applies the user's answer to the permission prompt. Granting through
    /// the settings screen is picked up by the next scheduling attempt.
    pub fn handle_prompt_choice(&mut self, choice: PromptChoice) {
        tracing::info!(?choice, "permission prompt answered");
        self.gate.handle_choice(choice);
    }

    /// Favorited performances present in the snapshot, soonest first.
    pub fn upcoming_favorites(&self) -> Vec<&Performance> {
        let mut upcoming: Vec<&Performance> = self
            .snapshot
            .iter()
            .filter(|performance| self.favorites.is_favorite(&performance.id))
            .collect();
        upcoming.sort_by(|a, b| a.cmp_by_start(b));
        upcoming
    }

    pub fn has_pending_reminder(&self, id: &PerformanceId) -> bool {
        self.scheduler.has_timer(id)
    }

    pub fn active_timer_count(&self) -> usize {
        self.scheduler.active_timer_count()
    }

    /// Cancels in-process timers. Platform alarms stay registered.
    pub fn shutdown(&mut self) -> usize {
        let cancelled = self.scheduler.shutdown();
        tracing::info!(cancelled, "festival service stopped");
        cancelled
    }

    fn rearm(&mut self) -> (usize, usize) {
        let mut scheduled = 0;
        let mut deferred = 0;
        for performance in &self.snapshot {
            if !self.favorites.is_favorite(&performance.id) {
                continue;
            }
            match self.scheduler.schedule_reminder(performance, &mut self.gate) {
                ScheduleOutcome::Scheduled { .. } => scheduled += 1,
                ScheduleOutcome::PermissionRequired => deferred += 1,
                _ => {}
            }
        }
        tracing::debug!(scheduled, deferred, "favorites re-armed");
        (scheduled, deferred)
    }

    fn persist_for_reboot(&self) {
        let favorited: Vec<Performance> = self
            .snapshot
            .iter()
            .filter(|performance| self.favorites.is_favorite(&performance.id))
            .cloned()
            .collect();
        if let Err(err) = self.backend.persist_favorites(&favorited) {
            tracing::warn!(%err, backend = self.backend.name(), "failed to hand favorites to platform");
        }
    }
}
