//! Driver Monitoring System (DMS)
//!
//! Real-time driver state analysis from per-frame facial features:
//! - Eye closure (drowsiness)
//! - Yawning, by episode count and duration
//! - Head turned away from the road (distraction)
//! - Head tilt
//! - Face absence
//!
//! Signals are debounced over wall-clock time and escalated through
//! `Safe < Notice < Warning < Danger < Sos`.

pub mod analysis;
pub mod config;
pub mod escalation;
pub mod monitor;
pub mod signals;
pub mod state;

pub use analysis::{AlertCause, AlertEvent, AlertLevel};
pub use config::MonitorConfig;
pub use escalation::{evaluate, Escalation};
pub use monitor::{update, DriverMonitor, MonitorState};
pub use signals::SignalDebouncer;
pub use state::{SignalReading, SignalSnapshot, SignalState, YawnEpisode};

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Configuration error: {field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: String,
    },
}
