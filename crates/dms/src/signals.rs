//! Signal debouncing
//!
//! Turns per-frame features into signal durations so that single-frame
//! noise never raises an alert on its own.

use crate::config::{MonitorConfig, DISTRACTION_PITCH_DEG, DISTRACTION_YAW_DEG};
use crate::state::{SignalSnapshot, SignalState, YawnEpisode};
use feature_engine::FeatureVector;
use tracing::debug;

/// Per-signal timers and the yawn counter for one monitoring session
#[derive(Debug, Clone, Default)]
pub struct SignalDebouncer {
    eye_closure: SignalState,
    yawn: SignalState,
    distraction: SignalState,
    face_absence: SignalState,
    yawn_episode: YawnEpisode,
}

impl SignalDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every signal with one frame of features
    pub fn update(&mut self, features: &FeatureVector, config: &MonitorConfig) -> SignalSnapshot {
        let now = features.timestamp;

        if self.yawn_episode.expire(now, config.yawn_reset_window_sec) {
            debug!("Yawn count reset after {}s without yawning", config.yawn_reset_window_sec);
        }

        if features.face_found {
            self.face_absence.clear();
            self.update_eyes(features, config);
            self.update_yawn(features, config);
            self.update_distraction(features);
        } else {
            self.face_absence.activate(now);
            // Nothing observed about eyes, mouth or pose this frame
            self.eye_closure.clear();
            self.yawn.clear();
            self.distraction.clear();
        }

        SignalSnapshot {
            timestamp: now,
            eye_closure: self.eye_closure.reading(now),
            yawn: self.yawn.reading(now),
            distraction: self.distraction.reading(now),
            face_absence: self.face_absence.reading(now),
            yawn_count: self.yawn_episode.count,
            roll_deg: if features.face_found { features.roll_deg } else { 0.0 },
        }
    }

    fn update_eyes(&mut self, features: &FeatureVector, config: &MonitorConfig) {
        if !config.sunglasses_mode && features.ear < config.ear_threshold {
            self.eye_closure.activate(features.timestamp);
        } else {
            self.eye_closure.clear();
        }
    }

    fn update_yawn(&mut self, features: &FeatureVector, config: &MonitorConfig) {
        if features.mar > config.mar_threshold {
            if !self.yawn.is_active() {
                self.yawn.activate(features.timestamp);
                self.yawn_episode.record(features.timestamp);
                debug!("Yawn {} started", self.yawn_episode.count);
            }
        } else {
            self.yawn.clear();
        }
    }

    fn update_distraction(&mut self, features: &FeatureVector) {
        if features.yaw_deg.abs() > DISTRACTION_YAW_DEG || features.pitch_deg > DISTRACTION_PITCH_DEG {
            self.distraction.activate(features.timestamp);
        } else {
            self.distraction.clear();
        }
    }

    /// Clear the eye, yawn and distraction state after the driver was lost.
    /// The face absence timer keeps running.
    pub fn reset_face_signals(&mut self) {
        self.eye_closure.clear();
        self.yawn.clear();
        self.distraction.clear();
        self.yawn_episode = YawnEpisode::default();
    }

    /// Back to the initial state (all inactive, no yawns)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn yawn_episode(&self) -> YawnEpisode {
        self.yawn_episode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmark_source::Timestamp;

    fn at(secs: f64) -> FeatureVector {
        FeatureVector {
            ear: 0.3,
            mar: 0.2,
            face_found: true,
            timestamp: Timestamp::from_secs_f64(secs),
            ..Default::default()
        }
    }

    #[test]
    fn test_eye_closure_duration_and_clear() {
        let config = MonitorConfig::default();
        let mut debouncer = SignalDebouncer::new();

        debouncer.update(&FeatureVector { ear: 0.1, ..at(0.0) }, &config);
        let snapshot = debouncer.update(&FeatureVector { ear: 0.1, ..at(1.5) }, &config);
        assert!(snapshot.eye_closure.active);
        assert!((snapshot.eye_closure.duration_sec - 1.5).abs() < 1e-9);

        // One open frame clears the duration
        let snapshot = debouncer.update(&at(1.6), &config);
        assert!(!snapshot.eye_closure.active);
        assert_eq!(snapshot.eye_closure.duration_sec, 0.0);
    }

    #[test]
    fn test_yawn_counted_once_per_episode() {
        let config = MonitorConfig::default();
        let mut debouncer = SignalDebouncer::new();

        let mut t = 0.0;
        for open in [true, true, true, false, false, true, true, false] {
            let mar = if open { 0.8 } else { 0.2 };
            debouncer.update(&FeatureVector { mar, ..at(t) }, &config);
            t += 0.1;
        }
        assert_eq!(debouncer.yawn_episode().count, 2);
    }

    #[test]
    fn test_yawn_duration_tracks_open_episode() {
        let config = MonitorConfig::default();
        let mut debouncer = SignalDebouncer::new();

        debouncer.update(&FeatureVector { mar: 0.9, ..at(10.0) }, &config);
        let snapshot = debouncer.update(&FeatureVector { mar: 0.9, ..at(14.0) }, &config);
        assert!((snapshot.yawn.duration_sec - 4.0).abs() < 1e-9);
        assert_eq!(snapshot.yawn_count, 1);
    }

    #[test]
    fn test_sunglasses_mode_ignores_ear() {
        let config = MonitorConfig {
            sunglasses_mode: true,
            ..Default::default()
        };
        let mut debouncer = SignalDebouncer::new();

        let snapshot = debouncer.update(&FeatureVector { ear: 0.05, ..at(0.0) }, &config);
        assert!(!snapshot.eye_closure.active);
    }

    #[test]
    fn test_distraction_thresholds() {
        let config = MonitorConfig::default();
        let mut debouncer = SignalDebouncer::new();

        let snapshot = debouncer.update(&FeatureVector { yaw_deg: -31.0, ..at(0.0) }, &config);
        assert!(snapshot.distraction.active);

        // Looking up does not count, only down
        let snapshot = debouncer.update(&FeatureVector { pitch_deg: -40.0, ..at(0.1) }, &config);
        assert!(!snapshot.distraction.active);

        let snapshot = debouncer.update(&FeatureVector { pitch_deg: 26.0, ..at(0.2) }, &config);
        assert!(snapshot.distraction.active);
    }

    #[test]
    fn test_face_absence_clears_face_signals() {
        let config = MonitorConfig::default();
        let mut debouncer = SignalDebouncer::new();

        debouncer.update(&FeatureVector { ear: 0.1, mar: 0.9, ..at(0.0) }, &config);
        let snapshot = debouncer.update(&FeatureVector::absent(Timestamp::from_secs_f64(0.5)), &config);

        assert!(snapshot.face_absence.active);
        assert!(!snapshot.eye_closure.active);
        assert!(!snapshot.yawn.active);
        // The count survives a short absence
        assert_eq!(snapshot.yawn_count, 1);

        debouncer.reset_face_signals();
        let snapshot = debouncer.update(&FeatureVector::absent(Timestamp::from_secs_f64(1.0)), &config);
        assert_eq!(snapshot.yawn_count, 0);
        assert!((snapshot.face_absence.duration_sec - 0.5).abs() < 1e-9);
    }
}
