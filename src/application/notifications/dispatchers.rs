use async_trait::async_trait;
use tracing::info;

use crate::application::events::SharedEventBus;
use crate::application::ports::{NotificationDispatcher, NotificationError};
use crate::domain::events::Notification;

/// Publishes onto the in-process event bus (SSE clients subscribe there)
pub struct EventBusDispatcher {
    bus: SharedEventBus,
}

impl EventBusDispatcher {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl NotificationDispatcher for EventBusDispatcher {
    fn name(&self) -> &'static str {
        "event_bus"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        // Zero receivers is fine: displays may simply not be connected.
        self.bus.publish(notification.clone());
        Ok(())
    }
}

/// Writes every notification to the log at info level
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| NotificationError::Rejected(e.to_string()))?;
        info!(
            event_type = notification.event_type(),
            station_id = notification.station_id(),
            session_id = notification.session_id(),
            payload = %payload,
            "🔔 Notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;
    use crate::domain::events::CostLimitReachedEvent;
    use chrono::Utc;

    fn limit_reached() -> Notification {
        Notification::CostLimitReached(CostLimitReachedEvent {
            session_id: "s1".into(),
            station_id: "ps-2".into(),
            cost_limit: 5000,
            gaming_cost: 5100,
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn event_bus_dispatcher_publishes() {
        let bus = create_event_bus(16);
        let mut sub = bus.subscribe();
        let dispatcher = EventBusDispatcher::new(bus.clone());

        dispatcher.dispatch(&limit_reached()).await.unwrap();

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "costLimitReached");
        assert_eq!(msg.event.station_id(), "ps-2");
    }

    #[tokio::test]
    async fn log_dispatcher_accepts_everything() {
        assert!(LogDispatcher.dispatch(&limit_reached()).await.is_ok());
    }
}
