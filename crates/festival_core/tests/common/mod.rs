#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use festival_core::backend::AlarmBridge;
use festival_core::notifications::{
    NotificationBackend, NotificationError, NotificationId, NotificationRequest, ScheduledAlarm,
    TimerHandle,
};
use festival_core::performance::{AccessibilityTags, Performance, PerformanceId, PerformanceStatus};
use festival_core::permission::{Prompt, PromptSurface};
use parking_lot::Mutex;

pub fn today_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 6)
        .expect("date")
        .and_hms_opt(hour, minute, 0)
        .expect("time")
}

pub fn performance(id: &str, time: &str, status: PerformanceStatus) -> Performance {
    Performance {
        id: PerformanceId::new(id),
        event: "Café Theater Festival".into(),
        date: "06-07-2025".into(),
        time: time.into(),
        artist: "Collectief".into(),
        title: format!("Show {id}"),
        location: "Neude".into(),
        url: format!("https://example.org/{id}"),
        genre: "theater".into(),
        status,
        accessibility: AccessibilityTags::default(),
    }
}

/// In-process backend that records every request and hands out live timers.
#[derive(Default)]
pub struct RecordingBackend {
    pub requests: Mutex<Vec<NotificationRequest>>,
    pub cancelled: Mutex<Vec<String>>,
    pub timers_cancelled: Arc<Mutex<Vec<String>>>,
}

impl RecordingBackend {
    pub fn request_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|request| request.id.as_str().to_string())
            .collect()
    }
}

impl NotificationBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn schedule_at(
        &self,
        request: NotificationRequest,
    ) -> Result<ScheduledAlarm, NotificationError> {
        let id = request.id.as_str().to_string();
        self.requests.lock().push(request);
        let log = self.timers_cancelled.clone();
        Ok(ScheduledAlarm::Local(TimerHandle::new(
            move || log.lock().push(id),
            Arc::new(AtomicBool::new(false)),
        )))
    }

    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError> {
        self.cancelled.lock().push(id.as_str().to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeCall {
    pub id: String,
    pub title: String,
    pub at_epoch_millis: i64,
    pub url: String,
}

/// Stand-in for a native host shell with a toggleable exact-alarm grant.
#[derive(Default)]
pub struct FakeHost {
    pub granted: AtomicBool,
    pub scheduled: Mutex<Vec<NativeCall>>,
    pub cancelled: Mutex<Vec<String>>,
    pub settings_opened: Mutex<usize>,
    pub saved_favorites: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }
}

impl AlarmBridge for FakeHost {
    fn schedule_native_notification(
        &self,
        title: &str,
        _body: &str,
        at_epoch_millis: i64,
        id: &str,
        url: &str,
    ) -> Result<(), NotificationError> {
        self.scheduled.lock().push(NativeCall {
            id: id.to_string(),
            title: title.to_string(),
            at_epoch_millis,
            url: url.to_string(),
        });
        Ok(())
    }

    fn cancel_native_notification(&self, id: &str) -> Result<(), NotificationError> {
        self.cancelled.lock().push(id.to_string());
        Ok(())
    }

    fn can_schedule_exact_alarms(&self) -> Result<bool, NotificationError> {
        Ok(self.granted.load(Ordering::SeqCst))
    }

    fn open_exact_alarm_settings(&self) -> Result<(), NotificationError> {
        *self.settings_opened.lock() += 1;
        Ok(())
    }

    fn open_app_settings(&self) -> Result<(), NotificationError> {
        Ok(())
    }

    fn save_favorites_for_reboot(&self, favorites_json: &str) -> Result<(), NotificationError> {
        self.saved_favorites.lock().push(favorites_json.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSurface {
    pub prompts: Mutex<Vec<Prompt>>,
}

impl PromptSurface for RecordingSurface {
    fn present(&self, prompt: Prompt) {
        self.prompts.lock().push(prompt);
    }
}
