//! Session billing: the engine, its station locks and the periodic evaluator

pub mod engine;
pub mod evaluator;
pub mod locks;

pub use engine::{
    BillingEngine, EndedSession, LiveSession, SessionDetails, StartOptions, StationOverview,
};
pub use evaluator::start_session_evaluator;
pub use locks::StationLocks;
