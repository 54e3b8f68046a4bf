//! Session cost arithmetic
//!
//! Pure and integer-only. Each segment is billed per started minute:
//! `round_half_up(rate × minutes / 60)` with the division done once.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::session::{GameMode, Segment, Session};
use crate::domain::Piasters;

const MS_PER_MINUTE: i64 = 60_000;

/// Billed cost of one segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentCost {
    pub segment_id: String,
    pub mode: GameMode,
    pub hourly_rate: Piasters,
    pub billable_ms: i64,
    pub minutes: i64,
    pub cost: Piasters,
}

/// Gaming cost of a session at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub segments: Vec<SegmentCost>,
    pub segments_total: Piasters,
    pub extra_charges: Piasters,
    /// `segments_total + extra_charges`
    pub gaming_cost: Piasters,
    pub elapsed_minutes: i64,
}

/// Minutes billed for a span: every started minute counts, empty spans are free.
pub fn billable_minutes(ms: i64) -> i64 {
    if ms <= 0 {
        0
    } else {
        (ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE
    }
}

/// `rate × minutes / 60`, rounded half up.
pub fn segment_cost(hourly_rate: Piasters, minutes: i64) -> Piasters {
    let piaster_minutes = hourly_rate * minutes;
    (piaster_minutes + 30).div_euclid(60)
}

/// Cost of `session` with its `segments` (in sequence order) as of `now`.
///
/// An open segment runs until `now`. Pauses that already ended are carried
/// on the segment (`paused_ms`); a pause still running is subtracted from the
/// last segment here.
pub fn compute_cost(session: &Session, segments: &[Segment], now: DateTime<Utc>) -> CostBreakdown {
    let last_index = segments.len().checked_sub(1);
    let running_pause_ms = session
        .paused_at()
        .map(|paused_at| (now - paused_at).num_milliseconds().max(0))
        .unwrap_or(0);

    let costs: Vec<SegmentCost> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let endpoint = segment.ended_at.unwrap_or(now);
            let mut billable_ms =
                (endpoint - segment.started_at).num_milliseconds() - segment.paused_ms;
            if Some(i) == last_index && segment.is_open() {
                billable_ms -= running_pause_ms;
            }
            let minutes = billable_minutes(billable_ms);
            SegmentCost {
                segment_id: segment.id.clone(),
                mode: segment.mode,
                hourly_rate: segment.hourly_rate_snapshot,
                billable_ms: billable_ms.max(0),
                minutes,
                cost: segment_cost(segment.hourly_rate_snapshot, minutes),
            }
        })
        .collect();

    let segments_total = costs.iter().map(|c| c.cost).sum();
    let elapsed_minutes = costs.iter().map(|c| c.minutes).sum();

    CostBreakdown {
        segments: costs,
        segments_total,
        extra_charges: session.extra_charges,
        gaming_cost: segments_total + session.extra_charges,
        elapsed_minutes,
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::StartedBy;
    use crate::domain::station::{Station, StationStatus};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> DateTime<Utc> {
        t0() + Duration::minutes(n)
    }

    fn session() -> Session {
        let station = Station {
            id: "ps-1".into(),
            name: "PS5 #1".into(),
            mac_address: "aa:bb:cc:dd:ee:01".into(),
            hourly_rate_single: 2000,
            hourly_rate_multi: Some(3500),
            status: StationStatus::Available,
        };
        Session::new(&station, StartedBy::Manual, t0())
    }

    #[test]
    fn minutes_round_up() {
        assert_eq!(billable_minutes(0), 0);
        assert_eq!(billable_minutes(-5_000), 0);
        assert_eq!(billable_minutes(1), 1);
        assert_eq!(billable_minutes(60_000), 1);
        assert_eq!(billable_minutes(60_001), 2);
    }

    #[test]
    fn segment_cost_rounds_half_up() {
        assert_eq!(segment_cost(2000, 90), 3000);
        assert_eq!(segment_cost(2000, 80), 2667);
        assert_eq!(segment_cost(3500, 20), 1167);
        // 90 * 1 / 60 = 1.5 → 2
        assert_eq!(segment_cost(90, 1), 2);
        // 89 / 60 = 1.48 → 1
        assert_eq!(segment_cost(89, 1), 1);
        assert_eq!(segment_cost(2000, 0), 0);
    }

    #[test]
    fn uninterrupted_ninety_minutes() {
        let s = session();
        let mut seg = Segment::open(&s.id, GameMode::Single, 2000, t0());
        seg.close(minutes(90));

        let cost = compute_cost(&s, &[seg], minutes(200));
        assert_eq!(cost.gaming_cost, 3000);
        assert_eq!(cost.elapsed_minutes, 90);
    }

    #[test]
    fn completed_pause_is_not_billed() {
        let s = session();
        let mut seg = Segment::open(&s.id, GameMode::Single, 2000, t0());
        seg.paused_ms = 10 * 60_000;
        seg.close(minutes(90));

        let cost = compute_cost(&s, &[seg], minutes(90));
        assert_eq!(cost.elapsed_minutes, 80);
        assert_eq!(cost.gaming_cost, 2667);
    }

    #[test]
    fn running_pause_is_subtracted_from_open_segment() {
        let mut s = session();
        s.pause(minutes(80)).unwrap();
        let seg = Segment::open(&s.id, GameMode::Single, 2000, t0());

        let cost = compute_cost(&s, &[seg], minutes(90));
        assert_eq!(cost.elapsed_minutes, 80);
        assert_eq!(cost.gaming_cost, 2667);
    }

    #[test]
    fn mode_switch_bills_each_segment_at_its_rate() {
        let s = session();
        let mut first = Segment::open(&s.id, GameMode::Single, 2000, t0());
        first.close(minutes(30));
        let mut second = first.successor(GameMode::Multi, 3500, minutes(30));
        second.close(minutes(50));

        let cost = compute_cost(&s, &[first, second], minutes(50));
        assert_eq!(cost.segments[0].cost, 1000);
        assert_eq!(cost.segments[1].cost, 1167);
        assert_eq!(cost.gaming_cost, 2167);
        assert_eq!(cost.elapsed_minutes, 50);
    }

    #[test]
    fn extra_charges_are_added_and_may_discount() {
        let mut s = session();
        s.extra_charges = -500;
        let mut seg = Segment::open(&s.id, GameMode::Single, 2000, t0());
        seg.close(minutes(60));

        let cost = compute_cost(&s, &[seg], minutes(60));
        assert_eq!(cost.segments_total, 2000);
        assert_eq!(cost.gaming_cost, 1500);
    }

    #[test]
    fn cost_is_deterministic_for_a_given_now() {
        let s = session();
        let seg = Segment::open(&s.id, GameMode::Single, 2000, t0());
        let a = compute_cost(&s, std::slice::from_ref(&seg), minutes(45));
        let b = compute_cost(&s, std::slice::from_ref(&seg), minutes(45));
        assert_eq!(a, b);
        assert_eq!(a.gaming_cost, 1500);
    }

    #[test]
    fn partial_minute_is_billed_as_a_full_one() {
        let s = session();
        let seg = Segment::open(&s.id, GameMode::Single, 6000, t0());
        let cost = compute_cost(&s, &[seg], t0() + Duration::seconds(61));
        assert_eq!(cost.elapsed_minutes, 2);
        assert_eq!(cost.gaming_cost, 200);
    }

    #[test]
    fn no_segments_costs_only_extras() {
        let mut s = session();
        s.extra_charges = 700;
        let cost = compute_cost(&s, &[], minutes(10));
        assert_eq!(cost.gaming_cost, 700);
        assert_eq!(cost.elapsed_minutes, 0);
    }
}
