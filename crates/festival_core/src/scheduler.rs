use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::messages::Language;
use crate::notifications::{
    Clock, NotificationBackend, NotificationId, NotificationRequest, ScheduledAlarm,
};
use crate::performance::{Performance, PerformanceId, PerformanceStatus};
use crate::permission::PermissionGate;
use crate::timers::TimerTable;

pub const DEFAULT_REMINDER_LEAD_MINUTES: i64 = 20;

/// Delay between detecting a status change and showing it.
const STATUS_NOTICE_DELAY_SECONDS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled { at: NaiveDateTime },
    /// Date or time missing or unparsable.
    InvalidStart,
    /// The reminder moment already passed.
    TooLate,
    /// The reminder moment passed and the show is cancelled; a notice was sent.
    CancellationNotice,
    /// A late cancellation notice for this show was already sent.
    AlreadyNotified,
    PermissionRequired,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAlert {
    Cancelled,
    Full,
}

impl StatusAlert {
    pub fn for_status(status: PerformanceStatus) -> Option<Self> {
        match status {
            PerformanceStatus::Cancelled => Some(Self::Cancelled),
            PerformanceStatus::Full => Some(Self::Full),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Full => "full",
        }
    }
}

pub struct NotificationScheduler {
    backend: Arc<dyn NotificationBackend>,
    clock: Arc<dyn Clock>,
    timers: TimerTable,
    lead: Duration,
    language: Language,
    cancellation_notices: HashSet<PerformanceId>,
}

impl NotificationScheduler {
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
        language: Language,
    ) -> Self {
        Self {
            backend,
            clock,
            timers: TimerTable::new(),
            lead: Duration::minutes(DEFAULT_REMINDER_LEAD_MINUTES),
            language,
            cancellation_notices: HashSet::new(),
        }
    }

    pub fn with_lead(mut self, lead: Duration) -> Self {
        self.lead = lead;
        self
    }

    pub fn lead(&self) -> Duration {
        self.lead
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn reminder_instant(&self, performance: &Performance) -> Option<NaiveDateTime> {
        performance.start().map(|start| start - self.lead)
    }

    /// Arranges the reminder for a favorited performance, replacing any
    /// reminder already registered for it.
    pub fn schedule_reminder(
        &mut self,
        performance: &Performance,
        gate: &mut PermissionGate,
    ) -> ScheduleOutcome {
        self.timers.prune_fired();

        let Some(reminder_at) = self.reminder_instant(performance) else {
            tracing::debug!(id = %performance.id, date = %performance.date, time = %performance.time, "no valid start, skipping reminder");
            return ScheduleOutcome::InvalidStart;
        };

        let now = self.clock.now();
        if reminder_at <= now {
            if performance.status == PerformanceStatus::Cancelled {
                return self.send_late_cancellation(performance, now);
            }
            return ScheduleOutcome::TooLate;
        }

        if !gate.check_exact_alarm().allows_scheduling() {
            tracing::info!(id = %performance.id, "reminder deferred until exact alarms are allowed");
            return ScheduleOutcome::PermissionRequired;
        }

        let messages = self.language.messages();
        let request = NotificationRequest {
            id: NotificationId::from(&performance.id),
            title: messages.reminder_title.to_string(),
            body: messages.reminder_body(
                &performance.display_title(),
                &performance.location,
                self.lead.num_minutes(),
            ),
            scheduled_for: reminder_at,
            payload_url: payload_url(performance),
        };

        match self.backend.schedule_at(request) {
            Ok(ScheduledAlarm::Local(handle)) => {
                self.timers.cancel_and_replace(performance.id.clone(), handle);
            }
            Ok(ScheduledAlarm::Platform) => {
                self.timers.cancel(&performance.id);
            }
            Err(err) => {
                tracing::error!(id = %performance.id, %err, backend = self.backend.name(), "failed to schedule reminder");
                return ScheduleOutcome::Failed;
            }
        }

        tracing::debug!(id = %performance.id, at = %reminder_at, "reminder scheduled");
        ScheduleOutcome::Scheduled { at: reminder_at }
    }

    /// Cancels the in-process timer and the platform alarm for `id`.
    /// Unknown ids are a no-op.
    pub fn cancel(&mut self, id: &PerformanceId) -> bool {
        let had_timer = self.timers.cancel(id);
        if let Err(err) = self.backend.cancel(&NotificationId::from(id)) {
            tracing::error!(%id, %err, "failed to cancel platform reminder");
        }
        had_timer
    }

    /// Sends an immediate notice that a favorited show became unavailable.
    pub fn notify_status(&mut self, performance: &Performance, alert: StatusAlert) -> bool {
        let messages = self.language.messages();
        let show = performance.display_title();
        let (title, body) = match alert {
            StatusAlert::Cancelled => (messages.cancellation_title, messages.cancellation_body(&show)),
            StatusAlert::Full => (messages.full_title, messages.full_body(&show)),
        };
        let now = self.clock.now();
        let request = NotificationRequest {
            id: NotificationId::new(format!(
                "{}-{}-{}",
                alert.tag(),
                performance.id,
                now.and_utc().timestamp_millis()
            )),
            title: title.to_string(),
            body,
            scheduled_for: now + Duration::seconds(STATUS_NOTICE_DELAY_SECONDS),
            payload_url: payload_url(performance),
        };
        self.dispatch_now(request)
    }

    pub fn has_timer(&self, id: &PerformanceId) -> bool {
        self.timers.is_active(id)
    }

    pub fn active_timer_count(&self) -> usize {
        self.timers.active_count()
    }

    /// Cancels every in-process timer. Platform alarms stay registered.
    pub fn shutdown(&mut self) -> usize {
        self.timers.cancel_all()
    }

    fn send_late_cancellation(
        &mut self,
        performance: &Performance,
        now: NaiveDateTime,
    ) -> ScheduleOutcome {
        if !self.cancellation_notices.insert(performance.id.clone()) {
            return ScheduleOutcome::AlreadyNotified;
        }
        let messages = self.language.messages();
        let request = NotificationRequest {
            id: NotificationId::new(format!("cancellation-{}", performance.id)),
            title: messages.cancellation_title.to_string(),
            body: messages.cancellation_body(&performance.display_title()),
            scheduled_for: now,
            payload_url: payload_url(performance),
        };
        if self.dispatch_now(request) {
            ScheduleOutcome::CancellationNotice
        } else {
            ScheduleOutcome::Failed
        }
    }

    fn dispatch_now(&self, request: NotificationRequest) -> bool {
        let id = request.id.clone();
        match self.backend.schedule_at(request) {
            Ok(_) => {
                tracing::info!(%id, "status notification sent");
                true
            }
            Err(err) => {
                tracing::error!(%id, %err, "failed to send status notification");
                false
            }
        }
    }
}

fn payload_url(performance: &Performance) -> Option<String> {
    let url = performance.url.trim();
    (!url.is_empty()).then(|| url.to_string())
}
