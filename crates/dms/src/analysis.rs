//! Alert levels, causes and events

use landmark_source::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered alert severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    Safe = 0,
    Notice = 1,
    Warning = 2,
    Danger = 3,
    Sos = 4,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 5] = [
        AlertLevel::Safe,
        AlertLevel::Notice,
        AlertLevel::Warning,
        AlertLevel::Danger,
        AlertLevel::Sos,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Safe => "safe",
            AlertLevel::Notice => "notice",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
            AlertLevel::Sos => "sos",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a level was raised
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertCause {
    /// Face missing past the danger threshold
    DriverNotDetected { absent_sec: f64 },
    /// Face missing briefly
    SignalLost { absent_sec: f64 },
    /// Eyes closed past the fixed danger threshold
    WakeUp { closed_sec: f64 },
    /// Eyes closed past the configured warning threshold
    Drowsy { closed_sec: f64 },
    /// Head turned away from the road
    EyesOffRoad { away_sec: f64 },
    /// Mouth open past the yawn danger threshold
    ProlongedYawn { open_sec: f64 },
    /// Too many yawns inside the reset window
    FrequentYawning { count: u32 },
    /// Head roll beyond the configured angle
    HeadTilted { roll_deg: f64 },
}

impl AlertCause {
    pub fn level(&self) -> AlertLevel {
        match self {
            AlertCause::DriverNotDetected { .. } => AlertLevel::Sos,
            AlertCause::SignalLost { .. } => AlertLevel::Notice,
            AlertCause::WakeUp { .. } => AlertLevel::Sos,
            AlertCause::Drowsy { .. } => AlertLevel::Danger,
            AlertCause::EyesOffRoad { .. } => AlertLevel::Warning,
            AlertCause::ProlongedYawn { .. } => AlertLevel::Sos,
            AlertCause::FrequentYawning { .. } => AlertLevel::Warning,
            AlertCause::HeadTilted { .. } => AlertLevel::Notice,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AlertCause::DriverNotDetected { .. } => "driver not detected".to_string(),
            AlertCause::SignalLost { .. } => "signal lost".to_string(),
            AlertCause::WakeUp { .. } => "wake up".to_string(),
            AlertCause::Drowsy { .. } => "drowsy".to_string(),
            AlertCause::EyesOffRoad { .. } => "eyes off road".to_string(),
            AlertCause::ProlongedYawn { .. } => "prolonged yawn".to_string(),
            AlertCause::FrequentYawning { count } => format!("{} yawns detected", count),
            AlertCause::HeadTilted { .. } => "head tilted".to_string(),
        }
    }
}

/// Reason reported when nothing is wrong
pub const SAFE_REASON: &str = "driver attentive";

/// Outcome of evaluating one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub level: AlertLevel,
    /// Messages of all causes, in priority order
    pub reason: String,
    pub causes: Vec<AlertCause>,
    pub timestamp: Timestamp,
}

impl AlertEvent {
    /// Build an event from causes listed in priority order
    pub fn from_causes(causes: Vec<AlertCause>, timestamp: Timestamp) -> Self {
        let level = causes
            .iter()
            .map(AlertCause::level)
            .max()
            .unwrap_or(AlertLevel::Safe);
        let reason = if causes.is_empty() {
            SAFE_REASON.to_string()
        } else {
            causes
                .iter()
                .map(AlertCause::message)
                .collect::<Vec<_>>()
                .join(" | ")
        };

        Self {
            level,
            reason,
            causes,
            timestamp,
        }
    }

    pub fn safe(timestamp: Timestamp) -> Self {
        Self::from_causes(Vec::new(), timestamp)
    }

    pub fn is_safe(&self) -> bool {
        self.level == AlertLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(AlertLevel::Safe < AlertLevel::Notice);
        assert!(AlertLevel::Danger < AlertLevel::Sos);
        assert_eq!(AlertLevel::from_u8(3), Some(AlertLevel::Danger));
        assert_eq!(AlertLevel::from_u8(5), None);
        assert_eq!(AlertLevel::Warning.as_u8(), 2);
    }

    #[test]
    fn test_event_takes_highest_level_and_joins_reasons() {
        let event = AlertEvent::from_causes(
            vec![
                AlertCause::EyesOffRoad { away_sec: 1.0 },
                AlertCause::FrequentYawning { count: 4 },
                AlertCause::HeadTilted { roll_deg: 25.0 },
            ],
            Timestamp::ZERO,
        );
        assert_eq!(event.level, AlertLevel::Warning);
        assert_eq!(event.reason, "eyes off road | 4 yawns detected | head tilted");
    }

    #[test]
    fn test_safe_event() {
        let event = AlertEvent::safe(Timestamp::ZERO);
        assert!(event.is_safe());
        assert_eq!(event.reason, SAFE_REASON);
    }

    #[test]
    fn test_level_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&AlertLevel::Sos).unwrap(), "\"sos\"");
        let cause = serde_json::to_value(AlertCause::FrequentYawning { count: 3 }).unwrap();
        assert_eq!(cause["kind"], "frequent_yawning");
    }
}
