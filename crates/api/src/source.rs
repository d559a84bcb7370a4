//! Frame source tasks
//!
//! Publishes landmark frames into the hand-off slot at the configured rate,
//! either from a recorded replay file or from a scripted synthetic driver.

use feature_engine::SyntheticFace;
use landmark_source::{
    FramePublisher, LandmarkError, LandmarkFrame, LandmarkReplay, SourceConfig, SourceKind,
    Timestamp,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// One step of the synthetic driver script
#[derive(Debug, Clone, Copy)]
struct Phase {
    seconds: f64,
    face: Option<SyntheticFace>,
    /// Mouth opens and closes with this period instead of staying still
    yawn_period: Option<f64>,
}

/// Scripted driver used by the synthetic source. Repeats forever.
#[derive(Debug, Clone)]
pub struct DemoScenario {
    phases: Vec<Phase>,
}

impl Default for DemoScenario {
    fn default() -> Self {
        let attentive = SyntheticFace::default();
        let phase = |seconds, face| Phase {
            seconds,
            face,
            yawn_period: None,
        };

        Self {
            phases: vec![
                phase(5.0, Some(attentive)),
                // Eyes shut long enough to reach danger, then SOS
                phase(6.0, Some(attentive.with_ear(0.12))),
                phase(4.0, Some(attentive)),
                Phase {
                    seconds: 9.0,
                    face: Some(attentive),
                    yawn_period: Some(3.0),
                },
                phase(3.0, Some(attentive.with_pose(0.0, 40.0, 0.0))),
                phase(4.5, None),
                phase(3.5, Some(attentive.with_pose(0.0, 0.0, 28.0))),
                phase(5.0, Some(attentive)),
            ],
        }
    }
}

impl DemoScenario {
    /// Length of one pass through the script (seconds)
    pub fn period(&self) -> f64 {
        self.phases.iter().map(|p| p.seconds).sum()
    }

    /// The face at `secs` into the scenario, `None` while the driver is absent
    pub fn face_at(&self, secs: f64) -> Option<SyntheticFace> {
        let period = self.period();
        if period <= 0.0 {
            return None;
        }

        let mut t = secs.rem_euclid(period);
        for phase in &self.phases {
            if t < phase.seconds {
                let face = phase.face?;
                return Some(match phase.yawn_period {
                    // Open for the first half of each period
                    Some(every) if t.rem_euclid(every) < every / 2.0 => face.with_mar(0.8),
                    _ => face,
                });
            }
            t -= phase.seconds;
        }
        None
    }

    pub fn frame(&self, sequence: u64, config: &SourceConfig) -> LandmarkFrame {
        let secs = sequence as f64 / f64::from(config.fps.max(1));
        let timestamp = Timestamp::from_secs_f64(secs);
        match self.face_at(secs) {
            Some(face) => face.frame(timestamp, sequence, config.image_width, config.image_height),
            None => LandmarkFrame::empty(timestamp, sequence, config.image_width, config.image_height),
        }
    }
}

/// Start publishing frames. The task ends when the source is exhausted;
/// dropping the publisher then closes the hand-off.
pub fn spawn_source(config: SourceConfig, publisher: FramePublisher) -> Result<JoinHandle<()>, LandmarkError> {
    match config.kind {
        SourceKind::Synthetic => {
            info!("Starting synthetic source at {} fps", config.fps);
            Ok(tokio::spawn(run_synthetic(config, publisher)))
        }
        SourceKind::Replay => {
            let path = config
                .replay_path
                .clone()
                .map(PathBuf::from)
                .ok_or_else(|| LandmarkError::Parse {
                    line: 0,
                    reason: "no replay path configured".to_string(),
                })?;
            let replay = LandmarkReplay::open(&path)?;
            info!("Starting replay of {} at {} fps", path.display(), config.fps);
            Ok(tokio::spawn(run_replay(config, path, replay, publisher)))
        }
    }
}

async fn run_synthetic(config: SourceConfig, publisher: FramePublisher) {
    let scenario = DemoScenario::default();
    let mut ticker = interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sequence = 0u64;
    loop {
        ticker.tick().await;
        publisher.publish(scenario.frame(sequence, &config));
        sequence += 1;
    }
}

async fn run_replay(
    config: SourceConfig,
    path: PathBuf,
    mut replay: LandmarkReplay<BufReader<File>>,
    publisher: FramePublisher,
) {
    let mut ticker = interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let frame_nanos = config.frame_interval().as_nanos() as u64;

    // Added to replayed timestamps so that looping stays monotonic
    let mut base_nanos = 0u64;
    let mut last_nanos = 0u64;

    loop {
        match replay.next_frame() {
            Ok(Some(mut frame)) => {
                ticker.tick().await;
                frame.timestamp = Timestamp::from_nanos(base_nanos + frame.timestamp.as_nanos());
                last_nanos = frame.timestamp.as_nanos();
                publisher.publish(frame);
            }
            Ok(None) if config.loop_replay && replay.frames_read() > 0 => {
                debug!("Replay of {} restarting", path.display());
                base_nanos = last_nanos + frame_nanos;
                match LandmarkReplay::open(&path) {
                    Ok(reopened) => replay = reopened,
                    Err(e) => {
                        warn!("Replay could not be reopened: {}", e);
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(LandmarkError::Io(e)) => {
                warn!("Replay read failed: {}", e);
                break;
            }
            Err(e) => warn!("Skipping frame: {}", e),
        }
    }

    info!("Replay of {} finished after {} frames", path.display(), publisher.published());
}
