//! Alerting System
//!
//! Decides, per alert event, which side effects (sound, SOS email, history
//! record) actually run, and schedules them off the frame path.

mod builtin;
mod channels;
mod config;
mod gate;

pub use builtin::{LogEmailChannel, TerminalBell};
pub use channels::{EmailChannel, HistorySink, SoundChannel, SoundCue};
pub use config::{NotificationConfig, SoundMode};
pub use gate::{Channels, DispatchReport, NotificationGate};

use thiserror::Error;

/// Notification error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Sound output failed: {0}")]
    Sound(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("History record failed: {0}")]
    History(String),

    #[error("No async runtime available for dispatch")]
    NoRuntime,
}
