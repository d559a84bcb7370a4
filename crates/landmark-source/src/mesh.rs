//! MediaPipe face-mesh landmark layout

use crate::frame::{EyeLandmarks, FaceLandmarks, MouthLandmarks, Point2, PoseLandmarks};
use crate::LandmarkError;

/// Right eye (driver's right, image left) in P1..P6 order
pub const RIGHT_EYE: [usize; 6] = [33, 159, 158, 133, 153, 145];
/// Left eye (driver's left, image right) in P1..P6 order
pub const LEFT_EYE: [usize; 6] = [263, 386, 385, 362, 380, 374];
/// Inner lip: top, bottom, left corner, right corner
pub const MOUTH: [usize; 4] = [13, 14, 78, 308];
/// Nose tip, chin, left eye outer, right eye outer, left mouth, right mouth
pub const POSE: [usize; 6] = [1, 152, 33, 263, 61, 291];

/// Minimum mesh size (the 468-point mesh without iris refinement)
pub const MESH_POINTS: usize = 468;

impl FaceLandmarks {
    /// Pick the monitored roles out of a full face mesh
    pub fn from_mesh(mesh: &[Point2]) -> Result<Self, LandmarkError> {
        if mesh.len() < MESH_POINTS {
            return Err(LandmarkError::MeshTooSmall {
                actual: mesh.len(),
                required: MESH_POINTS,
            });
        }

        let eye = |idx: [usize; 6]| EyeLandmarks(idx.map(|i| mesh[i]));

        Ok(Self {
            right_eye: eye(RIGHT_EYE),
            left_eye: eye(LEFT_EYE),
            mouth: MouthLandmarks {
                top: mesh[MOUTH[0]],
                bottom: mesh[MOUTH[1]],
                left: mesh[MOUTH[2]],
                right: mesh[MOUTH[3]],
            },
            pose: PoseLandmarks {
                nose_tip: mesh[POSE[0]],
                chin: mesh[POSE[1]],
                left_eye_outer: mesh[POSE[2]],
                right_eye_outer: mesh[POSE[3]],
                left_mouth: mesh[POSE[4]],
                right_mouth: mesh[POSE[5]],
            },
        })
    }
}
