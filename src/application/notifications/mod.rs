//! Best-effort notification fan-out
//!
//! [`Notifier`] hands each notification to every registered
//! [`NotificationDispatcher`] on a detached task. Failures are logged and
//! counted; the caller never waits on delivery.

mod dispatchers;

pub use dispatchers::{EventBusDispatcher, LogDispatcher};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::ports::NotificationDispatcher;
use crate::domain::events::Notification;

pub const NOTIFICATIONS_FAILED_TOTAL: &str = "notifications_failed_total";

#[derive(Clone, Default)]
pub struct Notifier {
    dispatchers: Vec<Arc<dyn NotificationDispatcher>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn dispatcher_count(&self) -> usize {
        self.dispatchers.len()
    }

    /// Spawn one delivery task per dispatcher and return immediately.
    pub fn notify(&self, notification: Notification) {
        if self.dispatchers.is_empty() {
            return;
        }

        let notification = Arc::new(notification);
        for dispatcher in &self.dispatchers {
            let dispatcher = dispatcher.clone();
            let notification = notification.clone();
            tokio::spawn(async move {
                match dispatcher.dispatch(&notification).await {
                    Ok(()) => debug!(
                        dispatcher = dispatcher.name(),
                        event_type = notification.event_type(),
                        session_id = notification.session_id(),
                        "Notification delivered"
                    ),
                    Err(e) => {
                        warn!(
                            dispatcher = dispatcher.name(),
                            event_type = notification.event_type(),
                            session_id = notification.session_id(),
                            error = %e,
                            "Notification delivery failed"
                        );
                        metrics::counter!(
                            NOTIFICATIONS_FAILED_TOTAL,
                            "dispatcher" => dispatcher.name()
                        )
                        .increment(1);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Dispatchers for engine and monitor tests

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::application::ports::{NotificationDispatcher, NotificationError};
    use crate::domain::events::Notification;

    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub received: Mutex<Vec<Notification>>,
    }

    impl RecordingDispatcher {
        pub fn event_types(&self) -> Vec<&'static str> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.event_type())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
            self.received.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    pub struct FailingDispatcher;

    #[async_trait]
    impl NotificationDispatcher for FailingDispatcher {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn dispatch(&self, _notification: &Notification) -> Result<(), NotificationError> {
            Err(NotificationError::Unavailable("display offline".into()))
        }
    }

    /// Let spawned delivery tasks run to completion.
    pub async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{settle, FailingDispatcher, RecordingDispatcher};
    use super::*;
    use crate::domain::events::SessionStartedEvent;
    use chrono::Utc;

    fn started() -> Notification {
        Notification::SessionStarted(SessionStartedEvent {
            session_id: "s1".into(),
            station_id: "ps-1".into(),
            started_by: "auto".into(),
            hourly_rate: 2000,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn fans_out_to_every_dispatcher() {
        let a = Arc::new(RecordingDispatcher::default());
        let b = Arc::new(RecordingDispatcher::default());
        let notifier = Notifier::new()
            .with_dispatcher(a.clone())
            .with_dispatcher(b.clone());

        notifier.notify(started());
        settle().await;

        assert_eq!(a.event_types(), vec!["sessionStarted"]);
        assert_eq!(b.event_types(), vec!["sessionStarted"]);
    }

    #[tokio::test]
    async fn failing_dispatcher_does_not_affect_others() {
        let recorder = Arc::new(RecordingDispatcher::default());
        let notifier = Notifier::new()
            .with_dispatcher(Arc::new(FailingDispatcher))
            .with_dispatcher(recorder.clone());

        notifier.notify(started());
        settle().await;

        assert_eq!(recorder.event_types().len(), 1);
    }

    #[tokio::test]
    async fn no_dispatchers_is_a_no_op() {
        let notifier = Notifier::new();
        assert_eq!(notifier.dispatcher_count(), 0);
        notifier.notify(started());
    }
}
