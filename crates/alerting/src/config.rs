//! Notification configuration

use serde::{Deserialize, Serialize};

/// How alerts sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundMode {
    #[default]
    Beep,
    Voice,
    Off,
}

/// Cooldowns and recipients for notification side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Minimum gap between warning sounds (seconds)
    pub warning_sound_cooldown_sec: f64,

    /// Minimum gap between danger/SOS sounds (seconds)
    pub danger_sound_cooldown_sec: f64,

    /// Minimum gap between SOS emails (seconds)
    pub email_cooldown_sec: f64,

    /// Minimum gap between history records (seconds)
    pub history_debounce_sec: f64,

    /// SOS email recipient; empty disables email
    pub email_recipient: String,

    /// Name used in the SOS email
    pub driver_name: String,

    pub sound_mode: SoundMode,

    /// Play a soft chime on notice-level events
    pub notice_chime: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            warning_sound_cooldown_sec: 3.0,
            danger_sound_cooldown_sec: 2.0,
            email_cooldown_sec: 60.0,
            history_debounce_sec: 5.0,
            email_recipient: String::new(),
            driver_name: String::new(),
            sound_mode: SoundMode::Beep,
            notice_chime: false,
        }
    }
}

impl NotificationConfig {
    /// Recipient with surrounding whitespace removed, `None` if unset
    pub fn recipient(&self) -> Option<&str> {
        let recipient = self.email_recipient.trim();
        (!recipient.is_empty()).then_some(recipient)
    }
}
