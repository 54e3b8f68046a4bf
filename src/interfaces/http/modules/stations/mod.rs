//! Station module: listing and maintenance toggle

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
