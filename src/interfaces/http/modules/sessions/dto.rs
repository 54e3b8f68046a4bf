//! Session DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{EndedSession, LiveSession, SessionDetails};
use crate::domain::{Charge, CostBreakdown, Segment, SegmentCost, Session, Transfer};

/// Session snapshot. Amounts are piasters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
    pub station_id: String,
    /// active | paused | ended
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Gaming total, set once ended
    pub total_cost: Option<i64>,
    /// `total_cost + orders_cost - transferred_cost`, set once ended
    pub net_billed: Option<i64>,
    pub hourly_rate_snapshot: i64,
    pub orders_cost: i64,
    pub extra_charges: i64,
    pub transferred_cost: i64,
    /// single | multi
    pub current_mode: String,
    /// manual | auto
    pub started_by: String,
    pub timer_minutes: Option<u32>,
    pub cost_limit: Option<i64>,
    pub total_paused_ms: i64,
    pub notes: Option<String>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            status: s.state.name().to_string(),
            paused_at: s.paused_at(),
            ended_at: s.ended_at(),
            total_cost: s.total_cost(),
            net_billed: s.net_billed(),
            current_mode: s.current_mode.to_string(),
            started_by: s.started_by.to_string(),
            id: s.id,
            station_id: s.station_id,
            started_at: s.started_at,
            hourly_rate_snapshot: s.hourly_rate_snapshot,
            orders_cost: s.orders_cost,
            extra_charges: s.extra_charges,
            transferred_cost: s.transferred_cost,
            timer_minutes: s.timer_minutes,
            cost_limit: s.cost_limit,
            total_paused_ms: s.total_paused_ms,
            notes: s.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentCostResponse {
    pub segment_id: String,
    pub mode: String,
    pub hourly_rate: i64,
    pub billable_ms: i64,
    pub minutes: i64,
    pub cost: i64,
}

impl From<SegmentCost> for SegmentCostResponse {
    fn from(c: SegmentCost) -> Self {
        Self {
            segment_id: c.segment_id,
            mode: c.mode.to_string(),
            hourly_rate: c.hourly_rate,
            billable_ms: c.billable_ms,
            minutes: c.minutes,
            cost: c.cost,
        }
    }
}

/// Cost as of the response time (or the end time for ended sessions)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CostResponse {
    pub segments: Vec<SegmentCostResponse>,
    pub segments_total: i64,
    pub extra_charges: i64,
    pub gaming_cost: i64,
    pub elapsed_minutes: i64,
}

impl From<CostBreakdown> for CostResponse {
    fn from(c: CostBreakdown) -> Self {
        Self {
            segments: c.segments.into_iter().map(Into::into).collect(),
            segments_total: c.segments_total,
            extra_charges: c.extra_charges,
            gaming_cost: c.gaming_cost,
            elapsed_minutes: c.elapsed_minutes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LiveSessionResponse {
    pub session: SessionResponse,
    pub cost: CostResponse,
}

impl From<LiveSession> for LiveSessionResponse {
    fn from(l: LiveSession) -> Self {
        Self {
            session: l.session.into(),
            cost: l.cost.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentResponse {
    pub id: String,
    pub seq: i32,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub hourly_rate_snapshot: i64,
    pub paused_ms: i64,
}

impl From<Segment> for SegmentResponse {
    fn from(s: Segment) -> Self {
        Self {
            id: s.id,
            seq: s.seq,
            mode: s.mode.to_string(),
            started_at: s.started_at,
            ended_at: s.ended_at,
            hourly_rate_snapshot: s.hourly_rate_snapshot,
            paused_ms: s.paused_ms,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChargeResponse {
    pub id: String,
    pub session_id: String,
    pub amount: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Charge> for ChargeResponse {
    fn from(c: Charge) -> Self {
        Self {
            id: c.id,
            session_id: c.session_id,
            amount: c.amount,
            reason: c.reason,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub id: String,
    pub from_session_id: String,
    pub to_session_id: String,
    pub from_station_id: String,
    pub gaming_amount: i64,
    pub orders_amount: i64,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Transfer> for TransferResponse {
    fn from(t: Transfer) -> Self {
        Self {
            id: t.id,
            from_session_id: t.from_session_id,
            to_session_id: t.to_session_id,
            from_station_id: t.from_station_id,
            gaming_amount: t.gaming_amount,
            orders_amount: t.orders_amount,
            total_amount: t.total_amount,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionDetailsResponse {
    pub session: SessionResponse,
    pub segments: Vec<SegmentResponse>,
    pub charges: Vec<ChargeResponse>,
    pub transfers: Vec<TransferResponse>,
    pub cost: CostResponse,
}

impl From<SessionDetails> for SessionDetailsResponse {
    fn from(d: SessionDetails) -> Self {
        Self {
            session: d.session.into(),
            segments: d.segments.into_iter().map(Into::into).collect(),
            charges: d.charges.into_iter().map(Into::into).collect(),
            transfers: d.transfers.into_iter().map(Into::into).collect(),
            cost: d.cost.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndSessionResponse {
    pub session: SessionResponse,
    pub total_cost: i64,
    pub orders_cost: i64,
    pub net_billed: i64,
    pub elapsed_minutes: i64,
}

impl From<EndedSession> for EndSessionResponse {
    fn from(e: EndedSession) -> Self {
        Self {
            session: e.session.into(),
            total_cost: e.total_cost,
            orders_cost: e.orders_cost,
            net_billed: e.net_billed,
            elapsed_minutes: e.elapsed_minutes,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, max = 64, message = "station_id is required"))]
    pub station_id: String,
    #[validate(range(min = 1, max = 10080, message = "timer must be between 1 and 10080 minutes"))]
    pub timer_minutes: Option<u32>,
    #[validate(range(min = 0, message = "cost limit cannot be negative"))]
    pub cost_limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct EndSessionRequest {
    /// Replaces the computed gaming total
    #[validate(range(min = 0, message = "custom total cannot be negative"))]
    pub custom_total_cost: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SwitchModeRequest {
    /// single | multi
    #[validate(length(min = 1))]
    pub mode: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddChargeRequest {
    /// Signed piasters; negative values are discounts
    pub amount: i64,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordOrderRequest {
    #[validate(range(min = 1, message = "order amount must be positive"))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetTimerRequest {
    /// `null` clears the timer
    #[validate(range(min = 1, max = 10080, message = "timer must be between 1 and 10080 minutes"))]
    pub minutes: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetCostLimitRequest {
    /// `null` clears the limit
    #[validate(range(min = 0, message = "cost limit cannot be negative"))]
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetNotesRequest {
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferSessionRequest {
    #[validate(length(min = 1, message = "to_session_id is required"))]
    pub to_session_id: String,
    #[serde(default)]
    pub include_orders: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SwitchStationRequest {
    #[validate(length(min = 1, message = "station_id is required"))]
    pub station_id: String,
}
