//! Database entities module

pub mod charge;
pub mod segment;
pub mod session;
pub mod station;
pub mod transfer;

pub use charge::Entity as Charge;
pub use segment::Entity as Segment;
pub use session::Entity as Session;
pub use station::Entity as Station;
pub use transfer::Entity as Transfer;
