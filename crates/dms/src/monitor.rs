//! Per-frame monitoring pipeline
//!
//! `update` threads one explicit `MonitorState` through the debouncer and
//! the escalator. `DriverMonitor` adds feature extraction in front of it
//! and logs level transitions.

use crate::analysis::{AlertEvent, AlertLevel};
use crate::config::MonitorConfig;
use crate::escalation::{evaluate, Escalation};
use crate::signals::SignalDebouncer;
use crate::state::SignalSnapshot;
use feature_engine::{FeatureExtractor, FeatureVector};
use landmark_source::LandmarkFrame;
use tracing::{debug, info};

/// Everything that persists between frames of one monitoring session
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub signals: SignalDebouncer,
    /// Level of the most recent event
    pub level: AlertLevel,
    /// Readings of the most recent frame
    pub snapshot: SignalSnapshot,
    pub frames: u64,
}

impl MonitorState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Advance the state by one frame of features and produce its alert event
pub fn update(state: &mut MonitorState, features: &FeatureVector, config: &MonitorConfig) -> AlertEvent {
    let snapshot = state.signals.update(features, config);
    let Escalation {
        event,
        reset_face_signals,
    } = evaluate(&snapshot, config);

    if reset_face_signals {
        state.signals.reset_face_signals();
    }

    state.snapshot = snapshot;
    state.level = event.level;
    state.frames += 1;
    event
}

/// Landmark frame in, alert event out
#[derive(Debug, Default)]
pub struct DriverMonitor {
    extractor: FeatureExtractor,
    state: MonitorState,
}

impl DriverMonitor {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            state: MonitorState::default(),
        }
    }

    /// Run one frame through extraction, debouncing and escalation
    pub fn process(&mut self, frame: &LandmarkFrame, config: &MonitorConfig) -> AlertEvent {
        let features = self.extractor.extract(frame);
        self.process_features(&features, config)
    }

    pub fn process_features(&mut self, features: &FeatureVector, config: &MonitorConfig) -> AlertEvent {
        let previous = self.state.level;
        let event = update(&mut self.state, features, config);

        if event.level != previous {
            info!(
                "Alert level {} -> {} at {:.2}s: {}",
                previous,
                event.level,
                event.timestamp.as_secs_f64(),
                event.reason
            );
        }
        event
    }

    /// Back to the initial state (all signals inactive, no yawns)
    pub fn reset(&mut self) {
        debug!("Monitor state reset after {} frames", self.state.frames);
        self.state.reset();
    }

    pub fn level(&self) -> AlertLevel {
        self.state.level
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn frames_processed(&self) -> u64 {
        self.state.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmark_source::Timestamp;

    fn features(secs: f64) -> FeatureVector {
        FeatureVector {
            ear: 0.3,
            mar: 0.2,
            face_found: true,
            timestamp: Timestamp::from_secs_f64(secs),
            ..Default::default()
        }
    }

    #[test]
    fn test_update_tracks_level_and_frames() {
        let config = MonitorConfig::default();
        let mut state = MonitorState::default();

        update(&mut state, &FeatureVector { ear: 0.1, ..features(0.0) }, &config);
        let event = update(&mut state, &FeatureVector { ear: 0.1, ..features(2.1) }, &config);

        assert_eq!(event.level, AlertLevel::Danger);
        assert_eq!(state.level, AlertLevel::Danger);
        assert_eq!(state.frames, 2);
        assert!(state.snapshot.eye_closure.active);
    }

    #[test]
    fn test_confirmed_absence_resets_face_signals() {
        let config = MonitorConfig::default();
        let mut state = MonitorState::default();

        update(&mut state, &FeatureVector { mar: 0.9, ..features(0.0) }, &config);
        update(&mut state, &features(0.5), &config);
        assert_eq!(state.signals.yawn_episode().count, 1);

        update(&mut state, &FeatureVector::absent(Timestamp::from_secs_f64(1.0)), &config);
        let event = update(&mut state, &FeatureVector::absent(Timestamp::from_secs_f64(4.01)), &config);
        assert_eq!(event.level, AlertLevel::Sos);
        assert_eq!(state.signals.yawn_episode().count, 0);

        // Still absent: the absence timer was not restarted
        let event = update(&mut state, &FeatureVector::absent(Timestamp::from_secs_f64(4.5)), &config);
        assert_eq!(event.level, AlertLevel::Sos);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let config = MonitorConfig::default();
        let mut monitor = DriverMonitor::default();

        monitor.process_features(&FeatureVector { ear: 0.1, ..features(0.0) }, &config);
        monitor.process_features(&FeatureVector { ear: 0.1, ..features(3.0) }, &config);
        assert_eq!(monitor.level(), AlertLevel::Danger);

        monitor.reset();
        assert_eq!(monitor.level(), AlertLevel::Safe);
        assert_eq!(monitor.frames_processed(), 0);

        // A closed-eye frame right after the reset starts a fresh timer
        let event = monitor.process_features(&FeatureVector { ear: 0.1, ..features(3.1) }, &config);
        assert_eq!(event.level, AlertLevel::Safe);
    }
}
