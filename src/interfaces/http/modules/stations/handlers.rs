//! Station REST API handlers

use axum::{
    extract::{Path, State},
    Json,
};

use super::dto::{StationResponse, UpdateStationStatusRequest};
use crate::application::StationOverview;
use crate::domain::{DomainError, StationStatus};
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/stations",
    tag = "Stations",
    responses(
        (status = 200, description = "All stations", body = ApiResponse<Vec<StationResponse>>)
    )
)]
pub async fn list_stations(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StationResponse>>>, ApiError> {
    match state.engine.station_overview().await {
        Ok(stations) => Ok(Json(ApiResponse::success(
            stations.into_iter().map(Into::into).collect(),
        ))),
        Err(e) => Err(domain_error(e)),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/stations/{id}/status",
    tag = "Stations",
    params(("id" = String, Path, description = "Station ID")),
    request_body = UpdateStationStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<StationResponse>),
        (status = 400, description = "Status other than available or maintenance"),
        (status = 404, description = "Unknown station"),
        (status = 409, description = "Station has a live session")
    )
)]
pub async fn update_station_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateStationStatusRequest>,
) -> Result<Json<ApiResponse<StationResponse>>, ApiError> {
    let maintenance = match StationStatus::from_str(&req.status) {
        Some(StationStatus::Maintenance) => true,
        Some(StationStatus::Available) => false,
        _ => {
            return Err(domain_error(DomainError::Validation(format!(
                "status must be 'available' or 'maintenance', got '{}'",
                req.status
            ))))
        }
    };

    let station = state
        .engine
        .set_maintenance(&id, maintenance)
        .await
        .map_err(domain_error)?;
    let live_session_id = state
        .repos
        .sessions()
        .find_live_for_station(&id)
        .await
        .map_err(domain_error)?
        .map(|s| s.id);

    Ok(Json(ApiResponse::success(
        StationOverview {
            station,
            live_session_id,
        }
        .into(),
    )))
}
