use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use festival_core::notifications::{
    Clock, NotificationBackend, NotificationError, NotificationId, NotificationRequest,
    ScheduledAlarm, TimerHandle,
};
use tokio::runtime::Handle;

/// Shows a notification once its timer fires.
pub trait Delivery: Send + Sync {
    fn deliver(&self, request: &NotificationRequest);
}

/// Prints due notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl Delivery for LogDelivery {
    fn deliver(&self, request: &NotificationRequest) {
        tracing::info!(
            target: "festival::notification",
            id = %request.id,
            url = request.payload_url.as_deref().unwrap_or(""),
            "{}: {}",
            request.title,
            request.body
        );
    }
}

/// In-process delayed notifications on a tokio runtime. Timers die with the
/// process, so favorites are re-armed after every start.
pub struct TimerBackend {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    delivery: Arc<dyn Delivery>,
}

impl TimerBackend {
    pub fn new(runtime: Handle, clock: Arc<dyn Clock>, delivery: Arc<dyn Delivery>) -> Self {
        Self {
            runtime,
            clock,
            delivery,
        }
    }
}

impl NotificationBackend for TimerBackend {
    fn name(&self) -> &'static str {
        "tokio-timer"
    }

    fn schedule_at(
        &self,
        request: NotificationRequest,
    ) -> Result<ScheduledAlarm, NotificationError> {
        let delay = (request.scheduled_for - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let delivery = self.delivery.clone();
        tracing::trace!(id = %request.id, delay_secs = delay.as_secs(), "timer armed");

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::Release);
            delivery.deliver(&request);
        });
        let abort = task.abort_handle();
        Ok(ScheduledAlarm::Local(TimerHandle::new(
            move || abort.abort(),
            fired,
        )))
    }

    // Timers are owned and cancelled through their handles.
    fn cancel(&self, _id: &NotificationId) -> Result<(), NotificationError> {
        Ok(())
    }
}
