//! Landmark Source for the Driver Monitor
//!
//! Provides the per-frame input contract of the monitoring pipeline:
//! - Normalized facial landmark frames (eyes, mouth, pose roles)
//! - MediaPipe face-mesh index layout
//! - JSON-lines replay of recorded landmark streams
//! - Bounded latest-frame-wins hand-off between capture and processing

pub mod frame;
pub mod handoff;
pub mod mesh;
pub mod replay;

pub use frame::{
    EyeLandmarks, FaceLandmarks, LandmarkFrame, MouthLandmarks, Point2, PoseLandmarks, Timestamp,
};
pub use handoff::{frame_slot, FramePublisher, FrameSubscriber};
pub use replay::LandmarkReplay;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Landmark source error types
#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("Failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed landmark record on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Face mesh has {actual} points, need at least {required}")]
    MeshTooSmall { actual: usize, required: usize },
}

/// Where landmark frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Recorded JSON-lines landmark file
    Replay,
    /// Built-in synthetic driver scenario
    #[default]
    Synthetic,
}

/// Landmark source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source type
    pub kind: SourceKind,
    /// Replay file path (replay only)
    pub replay_path: Option<String>,
    /// Width of the image the landmarks were detected on
    pub image_width: u32,
    /// Height of the image the landmarks were detected on
    pub image_height: u32,
    /// Target FPS
    pub fps: u32,
    /// Restart the replay from the top when it ends
    pub loop_replay: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            replay_path: None,
            image_width: 640,
            image_height: 480,
            fps: 30,
            loop_replay: false,
        }
    }
}

impl SourceConfig {
    /// Create a replay config for a recorded landmark file
    pub fn replay(path: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Replay,
            replay_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Interval between frames at the configured rate
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}
