pub mod model;
pub mod repository;

pub use model::{Charge, GameMode, Segment, Session, SessionState, StartedBy, Transfer};
pub use repository::{SessionChangeSet, SessionRepository};
