//! Shared router state

use std::sync::Arc;
use std::time::Instant;

use crate::application::{BillingEngine, ConnectivityMonitor, SharedEventBus};
use crate::domain::RepositoryProvider;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BillingEngine>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub repos: Arc<dyn RepositoryProvider>,
    pub event_bus: SharedEventBus,
    pub started_at: Arc<Instant>,
}
