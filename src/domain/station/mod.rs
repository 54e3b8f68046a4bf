pub mod model;
pub mod repository;

pub use model::{normalize_mac, Station, StationStatus};
pub use repository::StationRepository;
