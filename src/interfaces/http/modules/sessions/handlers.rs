//! Session REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::*;
use crate::application::StartOptions;
use crate::domain::{DomainError, GameMode, StartedBy};
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = ApiResponse<SessionResponse>),
        (status = 404, description = "Unknown station"),
        (status = 409, description = "Station busy or under maintenance")
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<StartSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let options = StartOptions {
        timer_minutes: req.timer_minutes,
        cost_limit: req.cost_limit,
    };
    match state
        .engine
        .start_session(&req.station_id, StartedBy::Manual, options)
        .await
    {
        Ok(session) => Ok((StatusCode::CREATED, Json(ApiResponse::success(session.into())))),
        Err(e) => Err(domain_error(e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/active",
    tag = "Sessions",
    responses(
        (status = 200, description = "Live sessions with running cost", body = ApiResponse<Vec<LiveSessionResponse>>)
    )
)]
pub async fn list_active_sessions(State(state): State<AppState>) -> ApiResult<Vec<LiveSessionResponse>> {
    let live = state.engine.active_sessions().await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        live.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session with segments, charges and transfers", body = ApiResponse<SessionDetailsResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionDetailsResponse> {
    match state.engine.session_details(&id).await {
        Ok(details) => Ok(Json(ApiResponse::success(details.into()))),
        Err(e) => Err(domain_error(e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/cost",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Cost breakdown", body = ApiResponse<CostResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_session_cost(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CostResponse> {
    let cost = state.engine.live_cost(&id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(cost.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/end",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = EndSessionRequest,
    responses(
        (status = 200, description = "Session ended", body = ApiResponse<EndSessionResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Session already ended")
    )
)]
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<EndSessionRequest>,
) -> ApiResult<EndSessionResponse> {
    let ended = state
        .engine
        .end_session(&id, req.custom_total_cost)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(ended.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/pause",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Paused", body = ApiResponse<SessionResponse>),
        (status = 409, description = "Not active")
    )
)]
pub async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.engine.pause_session(&id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/resume",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Resumed", body = ApiResponse<SessionResponse>),
        (status = 409, description = "Not paused")
    )
)]
pub async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.engine.resume_session(&id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/mode",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SwitchModeRequest,
    responses(
        (status = 200, description = "Mode switched, new segment opened", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Unknown mode or no multi rate"),
        (status = 409, description = "Paused, ended or already in that mode")
    )
)]
pub async fn switch_mode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<SwitchModeRequest>,
) -> ApiResult<SessionResponse> {
    let mode = GameMode::from_str(&req.mode).ok_or_else(|| {
        domain_error(DomainError::Validation(format!(
            "unknown mode '{}', expected single or multi",
            req.mode
        )))
    })?;
    let session = state
        .engine
        .switch_mode(&id, mode)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/charges",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = AddChargeRequest,
    responses(
        (status = 201, description = "Charge recorded", body = ApiResponse<ChargeResponse>),
        (status = 400, description = "Zero amount"),
        (status = 409, description = "Session ended")
    )
)]
pub async fn add_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<AddChargeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChargeResponse>>), ApiError> {
    let charge = state
        .engine
        .add_charge(&id, req.amount, req.reason)
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(charge.into()))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}/charges/{charge_id}",
    tag = "Sessions",
    params(
        ("id" = String, Path, description = "Session ID"),
        ("charge_id" = String, Path, description = "Charge ID")
    ),
    responses(
        (status = 200, description = "Charge removed", body = ApiResponse<SessionResponse>),
        (status = 404, description = "Charge not found on this session")
    )
)]
pub async fn remove_charge(
    State(state): State<AppState>,
    Path((id, charge_id)): Path<(String, String)>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .remove_charge(&id, &charge_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/orders",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = RecordOrderRequest,
    responses(
        (status = 200, description = "Order added to the tab", body = ApiResponse<SessionResponse>),
        (status = 409, description = "Session ended")
    )
)]
pub async fn record_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RecordOrderRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .record_order(&id, req.amount)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/timer",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SetTimerRequest,
    responses(
        (status = 200, description = "Timer set or cleared", body = ApiResponse<SessionResponse>)
    )
)]
pub async fn set_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<SetTimerRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .set_timer(&id, req.minutes)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/cost-limit",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SetCostLimitRequest,
    responses(
        (status = 200, description = "Cost limit set or cleared", body = ApiResponse<SessionResponse>)
    )
)]
pub async fn set_cost_limit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<SetCostLimitRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .set_cost_limit(&id, req.amount)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/notes",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SetNotesRequest,
    responses(
        (status = 200, description = "Notes updated", body = ApiResponse<SessionResponse>)
    )
)]
pub async fn set_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<SetNotesRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .set_notes(&id, req.notes)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/transfer",
    tag = "Sessions",
    params(("id" = String, Path, description = "Source session ID")),
    request_body = TransferSessionRequest,
    responses(
        (status = 200, description = "Source ended, balance carried over", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Transfer onto itself"),
        (status = 409, description = "Either session not live")
    )
)]
pub async fn transfer_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<TransferSessionRequest>,
) -> ApiResult<TransferResponse> {
    let transfer = state
        .engine
        .transfer_session(&id, &req.to_session_id, req.include_orders)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(transfer.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/station",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = SwitchStationRequest,
    responses(
        (status = 200, description = "Session moved", body = ApiResponse<SessionResponse>),
        (status = 409, description = "Target busy or under maintenance")
    )
)]
pub async fn switch_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<SwitchStationRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .engine
        .switch_station(&id, &req.station_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(session.into())))
}
