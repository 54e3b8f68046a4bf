//! Application layer: use cases on top of the domain
//!
//! - **billing**: session state machine, per-station locking, periodic evaluation
//! - **connectivity**: edge-triggered link tracking driving auto start/end
//! - **events**: in-process broadcast bus for notifications
//! - **notifications**: best-effort fan-out to dispatchers
//! - **ports**: outbound interfaces implemented by adapters

pub mod billing;
pub mod connectivity;
pub mod events;
pub mod notifications;
pub mod ports;

pub use billing::{
    start_session_evaluator, BillingEngine, EndedSession, LiveSession, SessionDetails,
    StartOptions, StationOverview,
};
pub use connectivity::{ConnectivityMonitor, ConnectivityOutcome, LinkState, TrackedLink};
pub use events::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use notifications::{EventBusDispatcher, LogDispatcher, Notifier};
pub use ports::{NotificationDispatcher, NotificationError};
