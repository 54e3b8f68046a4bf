//! Server-sent notification stream

pub mod handlers;

pub use handlers::*;
