//! Non-database storage implementations

mod memory;

pub use memory::{InMemoryRepositoryProvider, InMemorySessionRepository, InMemoryStationRepository};
