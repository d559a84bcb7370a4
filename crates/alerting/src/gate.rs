//! Notification gate
//!
//! Per-channel cooldowns and the "already playing" guard. The gate only
//! schedules side effects; they run on the blocking pool so a slow audio
//! device or mail server never stalls frame processing.

use crate::channels::{EmailChannel, HistorySink, SoundChannel, SoundCue};
use crate::config::NotificationConfig;
use crate::NotifyError;
use dms::{AlertEvent, AlertLevel};
use landmark_source::Timestamp;
use metrics::counter;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SOS_SUBJECT: &str = "SOS: driver drowsiness";

/// Outbound channels used by the gate
#[derive(Clone)]
pub struct Channels {
    pub sound: Arc<dyn SoundChannel>,
    pub email: Arc<dyn EmailChannel>,
    pub history: Arc<dyn HistorySink>,
}

/// What one dispatch scheduled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub sound: Option<SoundCue>,
    /// A playing sound was stopped for this one
    pub interrupted: bool,
    pub email: bool,
    pub history: bool,
}

#[derive(Debug, Clone, Copy)]
struct Playing {
    level: AlertLevel,
    until: Timestamp,
}

/// Stateful dispatcher for alert side effects
pub struct NotificationGate {
    channels: Channels,
    runtime: Handle,
    last_sound: [Option<Timestamp>; AlertLevel::ALL.len()],
    playing: Option<Playing>,
    last_email: Option<Timestamp>,
    last_history: Option<Timestamp>,
    in_flight: Vec<JoinHandle<()>>,
}

impl NotificationGate {
    /// Create a gate that dispatches on the current tokio runtime
    pub fn new(channels: Channels) -> Result<Self, NotifyError> {
        let runtime = Handle::try_current().map_err(|_| NotifyError::NoRuntime)?;
        Ok(Self::with_runtime(channels, runtime))
    }

    pub fn with_runtime(channels: Channels, runtime: Handle) -> Self {
        Self {
            channels,
            runtime,
            last_sound: [None; AlertLevel::ALL.len()],
            playing: None,
            last_email: None,
            last_history: None,
            in_flight: Vec::new(),
        }
    }

    /// Decide which side effects this event triggers and schedule them
    pub fn dispatch(&mut self, event: &AlertEvent, config: &NotificationConfig) -> DispatchReport {
        self.in_flight.retain(|task| !task.is_finished());

        let mut report = DispatchReport::default();
        if event.level == AlertLevel::Safe {
            return report;
        }

        if let Some((cue, interrupt)) = self.admit_sound(event, config) {
            let sound = self.channels.sound.clone();
            let job_cue = cue.clone();
            self.schedule("sound", move || {
                if interrupt {
                    sound.stop()?;
                }
                sound.play(&job_cue, false)
            });
            report.sound = Some(cue);
            report.interrupted = interrupt;
        }

        if let Some(recipient) = self.admit_email(event, config) {
            let email = self.channels.email.clone();
            let body = sos_body(event, config);
            info!("Scheduling SOS email to {}", recipient);
            self.schedule("email", move || email.send(&recipient, SOS_SUBJECT, &body));
            report.email = true;
        }

        if self.admit_history(event, config) {
            let history = self.channels.history.clone();
            let (level, reason, timestamp) = (event.level, event.reason.clone(), event.timestamp);
            self.schedule("history", move || history.record(level, &reason, timestamp));
            report.history = true;
        }

        report
    }

    /// Returns the cue to play and whether a playing sound must be stopped first
    fn admit_sound(&mut self, event: &AlertEvent, config: &NotificationConfig) -> Option<(SoundCue, bool)> {
        let cue = SoundCue::for_level(event.level, config.sound_mode, config.notice_chime)?;
        let now = event.timestamp;
        let slot = event.level.as_u8() as usize;

        let cooldown = match event.level {
            AlertLevel::Warning => config.warning_sound_cooldown_sec,
            AlertLevel::Danger | AlertLevel::Sos => config.danger_sound_cooldown_sec,
            // Notice chime shares the warning pacing
            _ => config.warning_sound_cooldown_sec,
        };
        if let Some(last) = self.last_sound[slot] {
            if now.secs_since(last) < cooldown {
                return None;
            }
        }

        let playing = self.playing.filter(|p| now < p.until);
        if let Some(current) = playing {
            if event.level < current.level {
                debug!("Dropping {} sound while {} sound plays", event.level, current.level);
                return None;
            }
        }

        self.last_sound[slot] = Some(now);
        self.playing = Some(Playing {
            level: event.level,
            until: now.offset_secs(cue.duration().as_secs_f64()),
        });
        Some((cue, playing.is_some()))
    }

    fn admit_email(&mut self, event: &AlertEvent, config: &NotificationConfig) -> Option<String> {
        if event.level != AlertLevel::Sos {
            return None;
        }
        if let Some(last) = self.last_email {
            if event.timestamp.secs_since(last) < config.email_cooldown_sec {
                return None;
            }
        }
        let Some(recipient) = config.recipient() else {
            debug!("SOS email skipped: no recipient configured");
            return None;
        };

        self.last_email = Some(event.timestamp);
        Some(recipient.to_string())
    }

    fn admit_history(&mut self, event: &AlertEvent, config: &NotificationConfig) -> bool {
        if event.level < AlertLevel::Warning {
            return false;
        }
        if let Some(last) = self.last_history {
            if event.timestamp.secs_since(last) < config.history_debounce_sec {
                return false;
            }
        }
        self.last_history = Some(event.timestamp);
        true
    }

    fn schedule<F>(&mut self, channel: &'static str, job: F)
    where
        F: FnOnce() -> Result<(), NotifyError> + Send + 'static,
    {
        counter!("notifications_scheduled_total", "channel" => channel).increment(1);
        let task = self.runtime.spawn_blocking(move || {
            if let Err(e) = job() {
                counter!("notifications_failed_total", "channel" => channel).increment(1);
                warn!("{} notification failed: {}", channel, e);
            }
        });
        self.in_flight.push(task);
    }

    /// Side-effect tasks that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|task| !task.is_finished()).count()
    }

    /// Wait for every scheduled side effect to finish
    pub async fn flush(&mut self) {
        for task in self.in_flight.drain(..) {
            if let Err(e) = task.await {
                error!("Notification task aborted: {}", e);
            }
        }
    }

    /// Forget all cooldowns (new session, new timestamp origin)
    pub fn reset(&mut self) {
        self.last_sound = [None; AlertLevel::ALL.len()];
        self.playing = None;
        self.last_email = None;
        self.last_history = None;
    }
}

fn sos_body(event: &AlertEvent, config: &NotificationConfig) -> String {
    let driver = match config.driver_name.trim() {
        "" => "unknown driver",
        name => name,
    };
    format!(
        "Driver {} needs attention.\nReason: {}\nSession time: {:.1}s",
        driver,
        event.reason,
        event.timestamp.as_secs_f64()
    )
}
