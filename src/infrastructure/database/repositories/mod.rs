//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod repository_provider;
pub mod session_repository;
pub mod station_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use session_repository::SeaOrmSessionRepository;
pub use station_repository::SeaOrmStationRepository;
