pub mod cost;

pub use cost::{billable_minutes, compute_cost, segment_cost, CostBreakdown, SegmentCost};
