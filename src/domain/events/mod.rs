//! Domain events
//!
//! Notification payloads emitted by the billing engine.
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{
    CostLimitReachedEvent, EventMessage, Notification, SessionEndedEvent, SessionStartedEvent,
    TimerExpiredEvent, TimerWarningEvent,
};
