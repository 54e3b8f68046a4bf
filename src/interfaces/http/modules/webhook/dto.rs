use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::{ConnectivityOutcome, LinkState, TrackedLink};

/// Signal from a router; sent as JSON or as query parameters
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebhookSignal {
    /// Console MAC in any common notation
    pub mac: Option<String>,
    /// connect | disconnect (also up | down)
    pub action: Option<String>,
}

impl WebhookSignal {
    /// Fields present in `other` win
    pub fn merge(self, other: WebhookSignal) -> Self {
        Self {
            mac: other.mac.or(self.mac),
            action: other.action.or(self.action),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    /// started | ended; omitted when nothing changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            action: None,
            session_id: None,
            message: Some(message.into()),
        }
    }
}

impl From<ConnectivityOutcome> for WebhookResponse {
    fn from(outcome: ConnectivityOutcome) -> Self {
        Self {
            success: true,
            action: outcome.action().map(str::to_string),
            session_id: outcome.session_id().map(str::to_string),
            message: Some(outcome.message()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LinkStateResponse {
    pub mac: String,
    /// up | down | unknown
    pub state: String,
    pub changed_at: DateTime<Utc>,
}

impl From<TrackedLink> for LinkStateResponse {
    fn from(link: TrackedLink) -> Self {
        let state = match link.state {
            LinkState::Up => "up",
            LinkState::Down => "down",
            LinkState::Unknown => "unknown",
        };
        Self {
            mac: link.mac,
            state: state.to_string(),
            changed_at: link.changed_at,
        }
    }
}
