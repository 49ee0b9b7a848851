//! Hub statistics

pub mod metrics;

pub use metrics::{HubStats, HubStatsSnapshot};
