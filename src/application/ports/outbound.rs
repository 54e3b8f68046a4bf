//! Outbound ports: interfaces for announcing billing events
//!
//! [`NotificationDispatcher`] decouples the billing engine from whatever
//! actually reaches the players (station displays, staff dashboard, logs).
//! The engine never awaits a dispatcher directly: calls go through
//! [`Notifier`](crate::application::notifications::Notifier), which spawns
//! them and swallows failures after logging.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::events::Notification;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification target unavailable: {0}")]
    Unavailable(String),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Short name used in logs and metrics labels
    fn name(&self) -> &'static str;

    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError>;
}
