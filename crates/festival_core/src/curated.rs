use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::messages::Language;
use crate::notifications::{Clock, NotificationBackend, NotificationId, NotificationRequest};
use crate::permission::{PermissionGate, PermissionState};
use crate::storage::{load_json, save_json, KeyValueStore, CURATED_SCHEDULED_KEY};
use crate::timeparse;

/// An organiser-authored announcement from the curated feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratedNotification {
    pub id: String,
    pub date: String,
    pub text_nl: String,
    pub text_en: String,
    pub url: String,
}

impl CuratedNotification {
    fn body(&self, language: Language) -> &str {
        match language {
            Language::Dutch => self.text_nl.trim(),
            Language::English => self.text_en.trim(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuratedReport {
    pub scheduled: usize,
    pub already_scheduled: usize,
    pub skipped: usize,
    /// The batch was not processed because the permission prompt was shown.
    pub awaiting_permission: bool,
}

pub struct CuratedDispatcher {
    backend: Arc<dyn NotificationBackend>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    scheduled: BTreeSet<String>,
}

impl CuratedDispatcher {
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let scheduled: BTreeSet<String> = load_json(store.as_ref(), CURATED_SCHEDULED_KEY);
        Self {
            backend,
            clock,
            store,
            scheduled,
        }
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.scheduled.contains(id)
    }

    /// Schedules every future entry not seen before, persisting the ids in
    /// one write.
    pub fn process(
        &mut self,
        batch: &[CuratedNotification],
        gate: &mut PermissionGate,
        language: Language,
    ) -> CuratedReport {
        let mut report = CuratedReport::default();

        let permission = gate.check_exact_alarm();
        if permission == PermissionState::Denied && gate.is_prompt_open() {
            report.awaiting_permission = true;
            return report;
        }
        let allowed = permission.allows_scheduling();

        let now = self.clock.now();
        let title = language.messages().generic_title;
        let mut newly_scheduled = Vec::new();

        for entry in batch {
            let id = entry.id.trim();
            if id.is_empty() || entry.date.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            if self.scheduled.contains(id) {
                report.already_scheduled += 1;
                continue;
            }
            let Some(at) = timeparse::parse_instant(&entry.date) else {
                tracing::debug!(id, date = %entry.date, "curated entry has invalid date");
                report.skipped += 1;
                continue;
            };
            let body = entry.body(language);
            if at <= now || !allowed || body.is_empty() {
                report.skipped += 1;
                continue;
            }

            let request = NotificationRequest {
                id: NotificationId::new(id),
                title: title.to_string(),
                body: body.to_string(),
                scheduled_for: at,
                payload_url: (!entry.url.trim().is_empty()).then(|| entry.url.trim().to_string()),
            };
            match self.backend.schedule_at(request) {
                Ok(_) => newly_scheduled.push(id.to_string()),
                Err(err) => {
                    tracing::error!(id, %err, "failed to schedule curated notification");
                    report.skipped += 1;
                }
            }
        }

        report.scheduled = newly_scheduled.len();
        if !newly_scheduled.is_empty() {
            self.scheduled.extend(newly_scheduled);
            if let Err(err) = save_json(self.store.as_ref(), CURATED_SCHEDULED_KEY, &self.scheduled) {
                tracing::error!(%err, "failed to persist curated notification ids");
            }
        }
        tracing::info!(
            scheduled = report.scheduled,
            already = report.already_scheduled,
            skipped = report.skipped,
            "curated notifications processed"
        );
        report
    }
}
