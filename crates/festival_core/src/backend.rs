use chrono::{DateTime, Duration, Local, NaiveDateTime, Offset, TimeZone};

use crate::notifications::{
    NotificationBackend, NotificationError, NotificationId, NotificationRequest, ScheduledAlarm,
};
use crate::performance::Performance;

/// Calls exposed by a native host shell (for example an Android WebView
/// wrapper) that owns OS-level alarms.
pub trait AlarmBridge: Send + Sync {
    fn schedule_native_notification(
        &self,
        title: &str,
        body: &str,
        at_epoch_millis: i64,
        id: &str,
        url: &str,
    ) -> Result<(), NotificationError>;
    fn cancel_native_notification(&self, id: &str) -> Result<(), NotificationError>;
    fn can_schedule_exact_alarms(&self) -> Result<bool, NotificationError>;
    fn open_exact_alarm_settings(&self) -> Result<(), NotificationError>;
    fn open_app_settings(&self) -> Result<(), NotificationError>;
    fn save_favorites_for_reboot(&self, favorites_json: &str) -> Result<(), NotificationError>;
}

pub struct BridgeBackend<B> {
    bridge: B,
}

impl<B: AlarmBridge> BridgeBackend<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }
}

impl<B: AlarmBridge> NotificationBackend for BridgeBackend<B> {
    fn name(&self) -> &'static str {
        "native-bridge"
    }

    fn requires_exact_permission(&self) -> bool {
        true
    }

    fn can_schedule_exact(&self) -> Result<bool, NotificationError> {
        self.bridge.can_schedule_exact_alarms()
    }

    fn schedule_at(
        &self,
        request: NotificationRequest,
    ) -> Result<ScheduledAlarm, NotificationError> {
        let at = epoch_millis(request.scheduled_for)?;
        self.bridge.schedule_native_notification(
            &request.title,
            &request.body,
            at,
            request.id.as_str(),
            request.payload_url.as_deref().unwrap_or(""),
        )?;
        Ok(ScheduledAlarm::Platform)
    }

    fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError> {
        self.bridge.cancel_native_notification(id.as_str())
    }

    fn open_settings(&self) -> Result<(), NotificationError> {
        match self.bridge.open_exact_alarm_settings() {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(%err, "exact alarm settings unavailable, opening app settings");
                self.bridge.open_app_settings()
            }
        }
    }

    fn persist_favorites(&self, favorites: &[Performance]) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(favorites)
            .map_err(|err| NotificationError::Unavailable(err.to_string()))?;
        self.bridge.save_favorites_for_reboot(&payload)
    }
}

/// Used where the host offers no notification facility at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl NotificationBackend for NoopBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn schedule_at(
        &self,
        request: NotificationRequest,
    ) -> Result<ScheduledAlarm, NotificationError> {
        tracing::debug!(id = %request.id, "notifications disabled, dropping request");
        Ok(ScheduledAlarm::Platform)
    }

    fn cancel(&self, _id: &NotificationId) -> Result<(), NotificationError> {
        Ok(())
    }
}

fn epoch_millis(at: NaiveDateTime) -> Result<i64, NotificationError> {
    resolve_local(&Local, at)
        .map(|resolved| resolved.timestamp_millis())
        .ok_or(NotificationError::InvalidInstant(at))
}

/// Maps a wall-clock time to an instant. A time inside a spring-forward gap
/// keeps the offset in force before the gap and lands just after it.
fn resolve_local<Tz: TimeZone>(tz: &Tz, at: NaiveDateTime) -> Option<DateTime<Tz>> {
    if let Some(resolved) = tz.from_local_datetime(&at).earliest() {
        return Some(resolved);
    }
    let before = tz
        .offset_from_local_datetime(&(at - Duration::hours(3)))
        .earliest()?;
    let utc = at - Duration::seconds(i64::from(before.fix().local_minus_utc()));
    Some(tz.from_utc_datetime(&utc))
}
