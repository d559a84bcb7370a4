//! Feature Vector Assembly

use crate::geometry::{average_ear, pixel_mar};
use crate::pose::PoseSolver;
use landmark_source::{LandmarkFrame, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Per-frame facial features
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean eye aspect ratio of both eyes
    pub ear: f64,
    /// Mouth aspect ratio
    pub mar: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub roll_deg: f64,
    /// Whether a face was detected in the frame
    pub face_found: bool,
    /// Capture time of the source frame
    pub timestamp: Timestamp,
}

impl FeatureVector {
    /// Features for a frame without a face
    pub fn absent(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

/// Turns landmark frames into feature vectors. Holds no per-frame state.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    solver: PoseSolver,
}

impl FeatureExtractor {
    pub fn new(solver: PoseSolver) -> Self {
        Self { solver }
    }

    /// Extract features from one frame
    pub fn extract(&self, frame: &LandmarkFrame) -> FeatureVector {
        let Some(face) = frame.face.as_ref() else {
            return FeatureVector::absent(frame.timestamp);
        };

        let (w, h) = (frame.image_width, frame.image_height);
        let ear = average_ear(&face.right_eye, &face.left_eye, w, h);
        let mar = pixel_mar(&face.mouth, w, h);
        let pose = self.solver.estimate(&face.pose, w, h);

        trace!(
            "Frame {}: ear={:.3} mar={:.3} pitch={:.1} yaw={:.1} roll={:.1}",
            frame.sequence,
            ear,
            mar,
            pose.pitch,
            pose.yaw,
            pose.roll
        );

        FeatureVector {
            ear,
            mar,
            pitch_deg: pose.pitch,
            yaw_deg: pose.yaw,
            roll_deg: pose.roll,
            face_found: true,
            timestamp: frame.timestamp,
        }
    }
}
