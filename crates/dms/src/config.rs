//! Monitor configuration

use crate::DmsError;
use serde::{Deserialize, Serialize};

/// Continuous eye closure that escalates to SOS (seconds)
pub const EYE_CLOSED_DANGER_SEC: f64 = 5.0;
/// Continuous mouth opening that counts as a prolonged yawn (seconds)
pub const YAWN_DURATION_DANGER_SEC: f64 = 5.0;
/// Yaw beyond which the driver is looking away from the road (degrees)
pub const DISTRACTION_YAW_DEG: f64 = 30.0;
/// Downward pitch beyond which the driver is looking away (degrees)
pub const DISTRACTION_PITCH_DEG: f64 = 25.0;
/// Face absence that escalates to SOS (seconds)
pub const FACE_ABSENCE_DANGER_SEC: f64 = 3.0;

/// Detection thresholds, exchanged as one immutable snapshot per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// EAR below which the eyes count as closed
    pub ear_threshold: f64,

    /// MAR above which the mouth counts as open
    pub mar_threshold: f64,

    /// Eye closure that raises the drowsiness alert (seconds)
    pub eye_closed_warn_sec: f64,

    /// Yawns within the reset window that raise a warning
    pub yawn_count_threshold: u32,

    /// Quiet period after which the yawn count starts over (seconds)
    pub yawn_reset_window_sec: f64,

    /// Head roll that raises the tilt notice (degrees)
    pub head_angle_deg: f64,

    /// How long the head must stay turned away before it counts (seconds)
    pub distraction_debounce_sec: f64,

    /// Ignore EAR (eyes hidden behind sunglasses)
    pub sunglasses_mode: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            mar_threshold: 0.6,
            eye_closed_warn_sec: 2.0,
            yawn_count_threshold: 3,
            yawn_reset_window_sec: 60.0,
            head_angle_deg: 20.0,
            distraction_debounce_sec: 0.5,
            sunglasses_mode: false,
        }
    }
}

impl MonitorConfig {
    /// Create strict config (alerts sooner)
    pub fn strict() -> Self {
        Self {
            eye_closed_warn_sec: 1.0,
            yawn_count_threshold: 2,
            head_angle_deg: 15.0,
            ..Default::default()
        }
    }

    /// Create lenient config (alerts later)
    pub fn lenient() -> Self {
        Self {
            eye_closed_warn_sec: 3.0,
            yawn_count_threshold: 5,
            head_angle_deg: 30.0,
            ..Default::default()
        }
    }

    /// Check every field against its accepted range
    pub fn validate(&self) -> Result<(), DmsError> {
        open_unit("ear_threshold", self.ear_threshold)?;
        open_unit("mar_threshold", self.mar_threshold)?;
        within("eye_closed_warn_sec", self.eye_closed_warn_sec, 1.0, 10.0)?;
        within(
            "yawn_count_threshold",
            f64::from(self.yawn_count_threshold),
            1.0,
            10.0,
        )?;
        within("yawn_reset_window_sec", self.yawn_reset_window_sec, 1.0, 3600.0)?;
        within("head_angle_deg", self.head_angle_deg, 10.0, 60.0)?;
        within("distraction_debounce_sec", self.distraction_debounce_sec, 0.0, 10.0)?;
        Ok(())
    }
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), DmsError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DmsError::OutOfRange {
            field,
            value,
            range: format!("[{}, {}]", min, max),
        })
    }
}

fn open_unit(field: &'static str, value: f64) -> Result<(), DmsError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(DmsError::OutOfRange {
            field,
            value,
            range: "(0, 1)".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
        assert!(MonitorConfig::strict().validate().is_ok());
        assert!(MonitorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = MonitorConfig {
            head_angle_deg: 75.0,
            ..Default::default()
        };
        match config.validate() {
            Err(DmsError::OutOfRange { field, .. }) => assert_eq!(field, "head_angle_deg"),
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        let config = MonitorConfig {
            ear_threshold: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            yawn_count_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            eye_closed_warn_sec: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"ear_threshold": 0.2, "sunglasses_mode": true}"#).unwrap();
        assert_eq!(config.ear_threshold, 0.2);
        assert!(config.sunglasses_mode);
        assert_eq!(config.yawn_count_threshold, 3);
    }
}
