//! Background task that periodically evaluates timers and cost limits of
//! every live session.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::engine::BillingEngine;
use crate::shared::shutdown::ShutdownSignal;

/// Start the session evaluator.
///
/// Every `interval_secs` the engine walks all live sessions and raises
/// timer and cost-limit notifications. An evaluation in progress finishes
/// its commit before shutdown is observed.
pub fn start_session_evaluator(
    engine: Arc<BillingEngine>,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = interval_secs, "⏰ Session evaluator started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match engine.evaluate_all().await {
                        Ok(0) => {}
                        Ok(raised) => debug!(raised, "Session evaluation raised notifications"),
                        Err(e) => warn!(error = %e, "Session evaluation error"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("⏰ Session evaluator shutting down");
                    break;
                }
            }
        }

        info!("⏰ Session evaluator stopped");
    })
}
