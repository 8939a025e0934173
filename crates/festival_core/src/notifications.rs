use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::performance::{Performance, PerformanceId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PerformanceId> for NotificationId {
    fn from(value: &PerformanceId) -> Self {
        Self(value.as_str().to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: NotificationId,
    pub title: String,
    pub body: String,
    /// Local wall-clock time at which the notification should appear.
    pub scheduled_for: NaiveDateTime,
    pub payload_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification facility unavailable: {0}")]
    Unavailable(String),
    #[error("cannot express {0} as a platform instant")]
    InvalidInstant(NaiveDateTime),
}

/// Cancels an in-process timer. Dropping the handle leaves the timer running.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
    fired: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static, fired: Arc<AtomicBool>) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            fired,
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some() && !self.fired.load(Ordering::Acquire)
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// What a backend hands back after scheduling.
#[derive(Debug)]
pub enum ScheduledAlarm {
    /// The platform owns the alarm; cancel through the backend.
    Platform,
    /// An in-process timer owned by the caller.
    Local(TimerHandle),
}

/// Platform-specific notification adapters implement this trait. One variant
/// is chosen at startup.
pub trait NotificationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether exact-time alarms sit behind a user-granted capability.
    fn requires_exact_permission(&self) -> bool {
        false
    }

    fn can_schedule_exact(&self) -> Result<bool, NotificationError> {
        Ok(true)
    }

    fn schedule_at(&self, request: NotificationRequest)
        -> Result<ScheduledAlarm, NotificationError>;

    /// Cancels a platform-level alarm. Unknown ids are not an error.
    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError>;

    fn open_settings(&self) -> Result<(), NotificationError> {
        Ok(())
    }

    /// Hands the favorited performances to the platform so alarms can be
    /// restored after a device reboot.
    fn persist_favorites(&self, _favorites: &[Performance]) -> Result<(), NotificationError> {
        Ok(())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
