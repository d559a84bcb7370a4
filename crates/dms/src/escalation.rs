//! Alert escalation
//!
//! Pure decision over one frame's signal readings. Priority order:
//! face absence, eye closure, distraction, yawn, head angle. Face absence
//! short-circuits everything else; distraction is only considered while
//! the eyes raised nothing.

use crate::analysis::{AlertCause, AlertEvent};
use crate::config::{
    MonitorConfig, EYE_CLOSED_DANGER_SEC, FACE_ABSENCE_DANGER_SEC, YAWN_DURATION_DANGER_SEC,
};
use crate::state::SignalSnapshot;

/// Evaluation result for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub event: AlertEvent,
    /// The driver was lost: eye and yawn state must be reset
    pub reset_face_signals: bool,
}

/// Combine signal readings and thresholds into one alert event
pub fn evaluate(snapshot: &SignalSnapshot, config: &MonitorConfig) -> Escalation {
    let timestamp = snapshot.timestamp;

    let absence = snapshot.face_absence;
    if absence.active {
        let absent_sec = absence.duration_sec;
        let confirmed = absent_sec > FACE_ABSENCE_DANGER_SEC;
        let cause = if confirmed {
            AlertCause::DriverNotDetected { absent_sec }
        } else {
            AlertCause::SignalLost { absent_sec }
        };
        return Escalation {
            event: AlertEvent::from_causes(vec![cause], timestamp),
            reset_face_signals: confirmed,
        };
    }

    let mut causes = Vec::new();

    let eyes = snapshot.eye_closure;
    if eyes.active && eyes.duration_sec > EYE_CLOSED_DANGER_SEC {
        causes.push(AlertCause::WakeUp {
            closed_sec: eyes.duration_sec,
        });
    } else if eyes.active && eyes.duration_sec > config.eye_closed_warn_sec {
        causes.push(AlertCause::Drowsy {
            closed_sec: eyes.duration_sec,
        });
    } else {
        let away = snapshot.distraction;
        if away.active && away.duration_sec >= config.distraction_debounce_sec {
            causes.push(AlertCause::EyesOffRoad {
                away_sec: away.duration_sec,
            });
        }
    }

    let yawn = snapshot.yawn;
    if yawn.active && yawn.duration_sec > YAWN_DURATION_DANGER_SEC {
        causes.push(AlertCause::ProlongedYawn {
            open_sec: yawn.duration_sec,
        });
    } else if snapshot.yawn_count >= config.yawn_count_threshold {
        causes.push(AlertCause::FrequentYawning {
            count: snapshot.yawn_count,
        });
    }

    if snapshot.roll_deg.abs() > config.head_angle_deg {
        causes.push(AlertCause::HeadTilted {
            roll_deg: snapshot.roll_deg,
        });
    }

    Escalation {
        event: AlertEvent::from_causes(causes, timestamp),
        reset_face_signals: false,
    }
}
