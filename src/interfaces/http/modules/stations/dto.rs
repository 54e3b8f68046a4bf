use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::StationOverview;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StationResponse {
    pub id: String,
    pub name: String,
    pub mac_address: String,
    /// Piasters per hour
    pub hourly_rate_single: i64,
    /// Piasters per hour; `null` means multi mode bills the single rate
    pub hourly_rate_multi: Option<i64>,
    /// available | occupied | maintenance
    pub status: String,
    pub live_session_id: Option<String>,
}

impl From<StationOverview> for StationResponse {
    fn from(o: StationOverview) -> Self {
        let s = o.station;
        Self {
            status: s.status.to_string(),
            id: s.id,
            name: s.name,
            mac_address: s.mac_address,
            hourly_rate_single: s.hourly_rate_single,
            hourly_rate_multi: s.hourly_rate_multi,
            live_session_id: o.live_session_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStationStatusRequest {
    /// `available` or `maintenance`; occupancy follows sessions
    #[validate(length(min = 1))]
    pub status: String,
}
