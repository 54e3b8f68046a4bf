//! Edge-triggered presence tracking for console network links

pub mod monitor;

pub use monitor::{
    ConnectivityMonitor, ConnectivityOutcome, LinkAction, LinkState, TrackedLink,
    CONNECTIVITY_SIGNALS_TOTAL,
};
