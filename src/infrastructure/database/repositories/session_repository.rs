//! SeaORM implementation of SessionRepository
//!
//! `commit` applies a whole change set inside one database transaction.

use async_trait::async_trait;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::{
    Charge, DomainError, DomainResult, GameMode, Segment, Session, SessionChangeSet,
    SessionRepository, SessionState, StartedBy, Transfer,
};
use crate::infrastructure::database::entities::{charge, segment, session, transfer};

const STATUS_ENDED: &str = "ended";

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn corrupt(what: String) -> DomainError {
    DomainError::Storage(format!("corrupt session data: {what}"))
}

fn parse_mode(raw: &str) -> DomainResult<GameMode> {
    GameMode::from_str(raw).ok_or_else(|| corrupt(format!("unknown mode '{raw}'")))
}

fn session_to_domain(m: session::Model) -> DomainResult<Session> {
    let state = match m.status.as_str() {
        "active" => SessionState::Active,
        "paused" => SessionState::Paused {
            paused_at: m
                .paused_at
                .ok_or_else(|| corrupt(format!("paused session {} has no paused_at", m.id)))?,
        },
        STATUS_ENDED => SessionState::Ended {
            ended_at: m
                .ended_at
                .ok_or_else(|| corrupt(format!("ended session {} has no ended_at", m.id)))?,
            total_cost: m.total_cost.unwrap_or(0),
        },
        other => return Err(corrupt(format!("unknown status '{other}'"))),
    };
    let started_by = StartedBy::from_str(&m.started_by)
        .ok_or_else(|| corrupt(format!("unknown started_by '{}'", m.started_by)))?;
    let timer_minutes = m
        .timer_minutes
        .map(u32::try_from)
        .transpose()
        .map_err(|_| corrupt(format!("negative timer on session {}", m.id)))?;

    Ok(Session {
        current_mode: parse_mode(&m.current_mode)?,
        id: m.id,
        station_id: m.station_id,
        started_at: m.started_at,
        state,
        hourly_rate_snapshot: m.hourly_rate_snapshot,
        orders_cost: m.orders_cost,
        extra_charges: m.extra_charges,
        transferred_cost: m.transferred_cost,
        started_by,
        timer_minutes,
        timer_warning_notified: m.timer_warning_notified,
        timer_notified: m.timer_notified,
        cost_limit: m.cost_limit,
        cost_limit_notified: m.cost_limit_notified,
        total_paused_ms: m.total_paused_ms,
        notes: m.notes,
    })
}

fn session_to_active(s: Session) -> session::ActiveModel {
    let (paused_at, ended_at, total_cost) = match s.state {
        SessionState::Active => (None, None, None),
        SessionState::Paused { paused_at } => (Some(paused_at), None, None),
        SessionState::Ended {
            ended_at,
            total_cost,
        } => (None, Some(ended_at), Some(total_cost)),
    };
    session::ActiveModel {
        status: Set(s.state.name().to_string()),
        id: Set(s.id),
        station_id: Set(s.station_id),
        started_at: Set(s.started_at),
        paused_at: Set(paused_at),
        ended_at: Set(ended_at),
        total_cost: Set(total_cost),
        hourly_rate_snapshot: Set(s.hourly_rate_snapshot),
        orders_cost: Set(s.orders_cost),
        extra_charges: Set(s.extra_charges),
        transferred_cost: Set(s.transferred_cost),
        current_mode: Set(s.current_mode.as_str().to_string()),
        started_by: Set(s.started_by.as_str().to_string()),
        timer_minutes: Set(s.timer_minutes.map(|t| i32::try_from(t).unwrap_or(i32::MAX))),
        timer_warning_notified: Set(s.timer_warning_notified),
        timer_notified: Set(s.timer_notified),
        cost_limit: Set(s.cost_limit),
        cost_limit_notified: Set(s.cost_limit_notified),
        total_paused_ms: Set(s.total_paused_ms),
        notes: Set(s.notes),
    }
}

fn segment_to_domain(m: segment::Model) -> DomainResult<Segment> {
    Ok(Segment {
        mode: parse_mode(&m.mode)?,
        id: m.id,
        session_id: m.session_id,
        seq: m.seq,
        started_at: m.started_at,
        ended_at: m.ended_at,
        hourly_rate_snapshot: m.hourly_rate_snapshot,
        paused_ms: m.paused_ms,
    })
}

fn segment_to_active(s: Segment) -> segment::ActiveModel {
    segment::ActiveModel {
        id: Set(s.id),
        session_id: Set(s.session_id),
        seq: Set(s.seq),
        mode: Set(s.mode.as_str().to_string()),
        started_at: Set(s.started_at),
        ended_at: Set(s.ended_at),
        hourly_rate_snapshot: Set(s.hourly_rate_snapshot),
        paused_ms: Set(s.paused_ms),
    }
}

fn charge_to_domain(m: charge::Model) -> Charge {
    Charge {
        id: m.id,
        session_id: m.session_id,
        amount: m.amount,
        reason: m.reason,
        created_at: m.created_at,
    }
}

fn transfer_to_domain(m: transfer::Model) -> Transfer {
    Transfer {
        id: m.id,
        from_session_id: m.from_session_id,
        to_session_id: m.to_session_id,
        from_station_id: m.from_station_id,
        gaming_amount: m.gaming_amount,
        orders_amount: m.orders_amount,
        total_amount: m.total_amount,
        created_at: m.created_at,
    }
}

// ── Write helpers (run inside the commit transaction) ───────────

async fn upsert_session<C: ConnectionTrait>(db: &C, s: Session) -> Result<(), DbErr> {
    let exists = session::Entity::find_by_id(s.id.clone())
        .one(db)
        .await?
        .is_some();
    let model = session_to_active(s);
    if exists {
        model.update(db).await?;
    } else {
        model.insert(db).await?;
    }
    Ok(())
}

async fn upsert_segment<C: ConnectionTrait>(db: &C, s: Segment) -> Result<(), DbErr> {
    let exists = segment::Entity::find_by_id(s.id.clone())
        .one(db)
        .await?
        .is_some();
    let model = segment_to_active(s);
    if exists {
        model.update(db).await?;
    } else {
        model.insert(db).await?;
    }
    Ok(())
}

// ── SessionRepository impl ──────────────────────────────────────

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>> {
        session::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(session_to_domain)
            .transpose()
    }

    async fn find_live_for_station(&self, station_id: &str) -> DomainResult<Option<Session>> {
        session::Entity::find()
            .filter(session::Column::StationId.eq(station_id))
            .filter(session::Column::Status.ne(STATUS_ENDED))
            .order_by_desc(session::Column::StartedAt)
            .one(&self.db)
            .await?
            .map(session_to_domain)
            .transpose()
    }

    async fn find_live(&self) -> DomainResult<Vec<Session>> {
        session::Entity::find()
            .filter(session::Column::Status.ne(STATUS_ENDED))
            .order_by_asc(session::Column::StartedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(session_to_domain)
            .collect()
    }

    async fn segments(&self, session_id: &str) -> DomainResult<Vec<Segment>> {
        segment::Entity::find()
            .filter(segment::Column::SessionId.eq(session_id))
            .order_by_asc(segment::Column::Seq)
            .all(&self.db)
            .await?
            .into_iter()
            .map(segment_to_domain)
            .collect()
    }

    async fn charges(&self, session_id: &str) -> DomainResult<Vec<Charge>> {
        let models = charge::Entity::find()
            .filter(charge::Column::SessionId.eq(session_id))
            .order_by_asc(charge::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(charge_to_domain).collect())
    }

    async fn transfers(&self, session_id: &str) -> DomainResult<Vec<Transfer>> {
        let models = transfer::Entity::find()
            .filter(
                Condition::any()
                    .add(transfer::Column::FromSessionId.eq(session_id))
                    .add(transfer::Column::ToSessionId.eq(session_id)),
            )
            .order_by_asc(transfer::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(transfer_to_domain).collect())
    }

    async fn commit(&self, changes: SessionChangeSet) -> DomainResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        debug!(
            "Committing session changes: {} sessions, {} segments, +{}/-{} charges, {} transfers",
            changes.sessions.len(),
            changes.segments.len(),
            changes.new_charges.len(),
            changes.removed_charges.len(),
            changes.transfers.len()
        );

        // Dropping `txn` on an early return rolls everything back.
        let txn = self.db.begin().await?;

        for s in changes.sessions {
            upsert_session(&txn, s).await?;
        }
        for s in changes.segments {
            upsert_segment(&txn, s).await?;
        }
        for c in changes.new_charges {
            charge::ActiveModel {
                id: Set(c.id),
                session_id: Set(c.session_id),
                amount: Set(c.amount),
                reason: Set(c.reason),
                created_at: Set(c.created_at),
            }
            .insert(&txn)
            .await?;
        }
        for id in changes.removed_charges {
            charge::Entity::delete_by_id(id).exec(&txn).await?;
        }
        for t in changes.transfers {
            transfer::ActiveModel {
                id: Set(t.id),
                from_session_id: Set(t.from_session_id),
                to_session_id: Set(t.to_session_id),
                from_station_id: Set(t.from_station_id),
                gaming_amount: Set(t.gaming_amount),
                orders_amount: Set(t.orders_amount),
                total_amount: Set(t.total_amount),
                created_at: Set(t.created_at),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
