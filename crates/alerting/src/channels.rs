//! Outbound channel contracts

use crate::config::SoundMode;
use crate::NotifyError;
use dms::AlertLevel;
use landmark_source::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Assumed length of a spoken voice clip
const VOICE_CLIP_MS: u64 = 1500;

/// Something a sound channel can play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoundCue {
    /// Soft notice chime
    Chime,
    Beep { frequency_hz: u32, duration_ms: u64 },
    /// Spoken warning clip
    Voice { clip: String },
}

impl SoundCue {
    /// Cue for an alert level, `None` if the level is silent
    pub fn for_level(level: AlertLevel, mode: SoundMode, notice_chime: bool) -> Option<SoundCue> {
        let beep = |frequency_hz, duration_ms| SoundCue::Beep {
            frequency_hz,
            duration_ms,
        };
        let voice = |clip: &str| SoundCue::Voice {
            clip: clip.to_string(),
        };

        match (mode, level) {
            (SoundMode::Off, _) | (_, AlertLevel::Safe) => None,
            (_, AlertLevel::Notice) => notice_chime.then_some(SoundCue::Chime),
            (SoundMode::Beep, AlertLevel::Warning) => Some(beep(1500, 200)),
            (SoundMode::Beep, AlertLevel::Danger) => Some(beep(2500, 500)),
            (SoundMode::Voice, AlertLevel::Warning) => Some(voice("warning")),
            (SoundMode::Voice, AlertLevel::Danger) => Some(voice("danger")),
            (_, AlertLevel::Sos) => Some(beep(3000, 800)),
        }
    }

    /// How long the cue plays
    pub fn duration(&self) -> Duration {
        match self {
            SoundCue::Chime => Duration::from_millis(150),
            SoundCue::Beep { duration_ms, .. } => Duration::from_millis(*duration_ms),
            SoundCue::Voice { .. } => Duration::from_millis(VOICE_CLIP_MS),
        }
    }
}

/// Audio output. Calls may overlap with an unfinished `play`.
pub trait SoundChannel: Send + Sync {
    fn play(&self, cue: &SoundCue, looping: bool) -> Result<(), NotifyError>;
    fn stop(&self) -> Result<(), NotifyError>;
}

/// Outbound email (SMTP or similar)
pub trait EmailChannel: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Append-only alert history
pub trait HistorySink: Send + Sync {
    fn record(&self, level: AlertLevel, reason: &str, timestamp: Timestamp) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beep_cues_per_level() {
        let cue = |level| SoundCue::for_level(level, SoundMode::Beep, false);
        assert_eq!(cue(AlertLevel::Safe), None);
        assert_eq!(cue(AlertLevel::Notice), None);
        assert_eq!(
            cue(AlertLevel::Warning),
            Some(SoundCue::Beep { frequency_hz: 1500, duration_ms: 200 })
        );
        assert_eq!(
            cue(AlertLevel::Danger),
            Some(SoundCue::Beep { frequency_hz: 2500, duration_ms: 500 })
        );
        assert_eq!(
            cue(AlertLevel::Sos),
            Some(SoundCue::Beep { frequency_hz: 3000, duration_ms: 800 })
        );
    }

    #[test]
    fn test_voice_mode_keeps_sos_beep() {
        let cue = |level| SoundCue::for_level(level, SoundMode::Voice, true);
        assert_eq!(cue(AlertLevel::Notice), Some(SoundCue::Chime));
        assert!(matches!(cue(AlertLevel::Danger), Some(SoundCue::Voice { .. })));
        assert!(matches!(cue(AlertLevel::Sos), Some(SoundCue::Beep { frequency_hz: 3000, .. })));
    }

    #[test]
    fn test_off_mode_is_silent() {
        for level in AlertLevel::ALL {
            assert_eq!(SoundCue::for_level(level, SoundMode::Off, true), None);
        }
    }
}
