pub mod events;
pub mod health;
pub mod metrics;
pub mod sessions;
pub mod stations;
pub mod webhook;
