//! Driver signal state tracking

use landmark_source::Timestamp;
use serde::{Deserialize, Serialize};

/// One debounced signal: inactive, or active since a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalState {
    active_since: Option<Timestamp>,
}

impl SignalState {
    /// Mark active; keeps the original start if already active
    pub fn activate(&mut self, now: Timestamp) {
        self.active_since.get_or_insert(now);
    }

    pub fn clear(&mut self) {
        self.active_since = None;
    }

    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    pub fn active_since(&self) -> Option<Timestamp> {
        self.active_since
    }

    /// Seconds active as of `now`, zero when inactive
    pub fn duration_sec(&self, now: Timestamp) -> f64 {
        self.active_since.map_or(0.0, |since| now.secs_since(since))
    }

    pub fn reading(&self, now: Timestamp) -> SignalReading {
        SignalReading {
            active: self.is_active(),
            duration_sec: self.duration_sec(now),
        }
    }
}

/// Yawn counter with a time-based reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct YawnEpisode {
    pub count: u32,
    pub last_yawn_at: Option<Timestamp>,
}

impl YawnEpisode {
    /// Count a new yawn starting at `now`
    pub fn record(&mut self, now: Timestamp) {
        self.count += 1;
        self.last_yawn_at = Some(now);
    }

    /// Start over if the last yawn is older than the window. Returns true on reset.
    pub fn expire(&mut self, now: Timestamp, window_sec: f64) -> bool {
        match self.last_yawn_at {
            Some(last) if now.secs_since(last) > window_sec => {
                *self = Self::default();
                true
            }
            _ => false,
        }
    }
}

/// What the escalator sees of one signal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalReading {
    pub active: bool,
    pub duration_sec: f64,
}

/// All signal readings for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub timestamp: Timestamp,
    pub eye_closure: SignalReading,
    pub yawn: SignalReading,
    pub distraction: SignalReading,
    pub face_absence: SignalReading,
    /// Yawns inside the current reset window
    pub yawn_count: u32,
    /// Head roll of this frame (degrees)
    pub roll_deg: f64,
}
