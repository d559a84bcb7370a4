//! Monitoring session
//!
//! One worker task runs the whole per-frame pipeline (extraction,
//! debouncing, escalation, notification gating) on frames taken from the
//! latest-frame-wins slot. The frame source runs as a separate task, so a
//! slow frame never backs up capture.

use crate::settings::ConfigHandle;
use crate::source::spawn_source;
use alerting::{Channels, NotificationGate, NotifyError};
use chrono::{DateTime, Utc};
use dms::{AlertEvent, DriverMonitor, SignalSnapshot};
use landmark_source::{frame_slot, FrameSubscriber, LandmarkError};
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use storage::{HistoryRepository, StorageError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Frame source failed to start: {0}")]
    Source(#[from] LandmarkError),

    #[error("Notification dispatch unavailable: {0}")]
    Notify(#[from] NotifyError),

    #[error("History unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Monitor plus the flag the worker checks before applying a frame
struct Core {
    monitor: DriverMonitor,
    active: bool,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    superseded: AtomicU64,
}

struct Running {
    id: Uuid,
    started_at: DateTime<Utc>,
    source: JoinHandle<()>,
    worker: JoinHandle<()>,
}

/// Session state as reported by the API
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub running: bool,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub frames_processed: u64,
    pub frames_superseded: u64,
    pub latest: Option<AlertEvent>,
    pub signals: SignalSnapshot,
}

/// Start/stop control over the monitoring pipeline
pub struct MonitorSession {
    config: ConfigHandle,
    history: Arc<HistoryRepository>,
    channels: Channels,
    core: Arc<Mutex<Core>>,
    counters: Arc<Counters>,
    events: Arc<watch::Sender<Option<AlertEvent>>>,
    running: Option<Running>,
}

impl MonitorSession {
    pub fn new(config: ConfigHandle, history: Arc<HistoryRepository>, channels: Channels) -> Self {
        let (events, _) = watch::channel(None);
        Self {
            config,
            history,
            channels,
            core: Arc::new(Mutex::new(Core {
                monitor: DriverMonitor::default(),
                active: false,
            })),
            counters: Arc::new(Counters::default()),
            events: Arc::new(events),
            running: None,
        }
    }

    /// Start monitoring. Returns the running session's id if already started.
    pub fn start(&mut self) -> Result<Uuid, SessionError> {
        if let Some(running) = &self.running {
            return Ok(running.id);
        }

        let settings = self.config.snapshot();
        let gate = NotificationGate::new(self.channels.clone())?;
        let id = Uuid::new_v4();
        self.history.start_session(id)?;

        let (publisher, subscriber) = frame_slot();
        let source = spawn_source(settings.source.clone(), publisher)?;

        {
            let mut core = lock(&self.core);
            core.monitor.reset();
            core.active = true;
        }
        self.counters.processed.store(0, Ordering::Relaxed);
        self.counters.superseded.store(0, Ordering::Relaxed);
        self.events.send_replace(None);

        let worker = tokio::spawn(run_worker(
            subscriber,
            self.core.clone(),
            self.config.clone(),
            gate,
            self.counters.clone(),
            self.events.clone(),
        ));

        info!("Monitoring session {} started", id);
        self.running = Some(Running {
            id,
            started_at: Utc::now(),
            source,
            worker,
        });
        Ok(id)
    }

    /// Stop monitoring and reset all driver state. Does not wait for
    /// in-flight notifications. Stopping twice is a no-op.
    pub fn stop(&mut self) -> Option<Uuid> {
        let running = self.running.take()?;

        {
            let mut core = lock(&self.core);
            core.active = false;
            core.monitor.reset();
        }
        running.source.abort();
        running.worker.abort();
        self.events.send_replace(None);
        gauge!("alert_level").set(0.0);

        info!(
            "Monitoring session {} stopped after {} frames",
            running.id,
            self.counters.processed.load(Ordering::Relaxed)
        );
        Some(running.id)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Most recent alert event of the running session
    pub fn latest(&self) -> Option<AlertEvent> {
        self.events.borrow().clone()
    }

    /// Follow alert events as they are produced
    pub fn subscribe(&self) -> watch::Receiver<Option<AlertEvent>> {
        self.events.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            running: self.is_running(),
            session_id: self.running.as_ref().map(|r| r.id),
            started_at: self.running.as_ref().map(|r| r.started_at),
            frames_processed: self.counters.processed.load(Ordering::Relaxed),
            frames_superseded: self.counters.superseded.load(Ordering::Relaxed),
            latest: self.latest(),
            signals: lock(&self.core).monitor.state().snapshot,
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker(
    subscriber: FrameSubscriber,
    core: Arc<Mutex<Core>>,
    config: ConfigHandle,
    mut gate: NotificationGate,
    counters: Arc<Counters>,
    events: Arc<watch::Sender<Option<AlertEvent>>>,
) {
    let mut superseded_seen = 0;

    while let Some(frame) = subscriber.next_frame().await {
        // One consistent snapshot for the whole frame
        let settings = config.snapshot();

        let event = {
            let mut core = lock(&core);
            if !core.active {
                break;
            }
            let event = core.monitor.process(&frame, &settings.monitor);
            events.send_replace(Some(event.clone()));
            event
        };

        let report = gate.dispatch(&event, &settings.notifications);
        if report.sound.is_some() || report.email || report.history {
            debug!("Frame {} dispatched {:?}", frame.sequence, report);
        }

        counters.processed.fetch_add(1, Ordering::Relaxed);
        counter!("frames_processed_total").increment(1);
        counter!("alert_events_total", "level" => event.level.as_str()).increment(1);
        gauge!("alert_level").set(f64::from(event.level.as_u8()));

        let superseded = subscriber.superseded();
        if superseded > superseded_seen {
            counter!("frames_superseded_total").increment(superseded - superseded_seen);
            counters.superseded.store(superseded, Ordering::Relaxed);
            superseded_seen = superseded;
        }
    }

    if subscriber.is_closed() {
        warn!("Frame source ended; monitoring idle until restarted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use alerting::{LogEmailChannel, SoundChannel, SoundCue};
    use dms::AlertLevel;
    use std::time::Duration;

    struct Silent;

    impl SoundChannel for Silent {
        fn play(&self, _cue: &SoundCue, _looping: bool) -> Result<(), NotifyError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn session() -> (MonitorSession, Arc<HistoryRepository>) {
        let history = Arc::new(HistoryRepository::new());
        let channels = Channels {
            sound: Arc::new(Silent),
            email: Arc::new(LogEmailChannel),
            history: history.clone(),
        };
        let session = MonitorSession::new(ConfigHandle::new(Settings::default()), history.clone(), channels);
        (session, history)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_processes_frames() {
        let (mut session, _history) = session();
        let id = session.start().unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let status = session.status();
        assert!(status.running);
        assert_eq!(status.session_id, Some(id));
        assert!(status.frames_processed > 0);
        assert_eq!(status.latest.map(|e| e.level), Some(AlertLevel::Safe));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_and_stop_resets() {
        let (mut session, _history) = session();
        let first = session.start().unwrap();
        assert_eq!(session.start().unwrap(), first);

        // Into the closed-eyes phase of the demo scenario
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert!(session.status().signals.eye_closure.active);

        assert_eq!(session.stop(), Some(first));
        assert_eq!(session.stop(), None);

        let status = session.status();
        assert!(!status.running);
        assert!(status.latest.is_none());
        assert!(!status.signals.eye_closure.active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alerts_reach_history() {
        let (mut session, history) = session();
        let id = session.start().unwrap();

        // Eyes closed from 5s to 11s reaches danger at 7s
        tokio::time::sleep(Duration::from_secs(10)).await;
        session.stop();
        // History writes run on the blocking pool
        for _ in 0..100 {
            if history.count() > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let records = history.recent(10).unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.session_id == id));
        assert!(records.iter().any(|r| r.level == AlertLevel::Danger));
    }
}
