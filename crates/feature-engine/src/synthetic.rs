//! Synthetic face landmarks with known features
//!
//! Renders landmark frames whose EAR, MAR and head pose are known in
//! advance. Used by scenario tests and by the demo frame source.

use crate::pose::{model_points, CameraIntrinsics};
use landmark_source::{
    EyeLandmarks, FaceLandmarks, LandmarkFrame, MouthLandmarks, Point2, PoseLandmarks, Timestamp,
};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Distance of the face model from the camera (model units)
const FACE_DISTANCE: f64 = 1500.0;
/// Eye width in pixels
const EYE_WIDTH_PX: f64 = 40.0;
/// Mouth width in pixels
const MOUTH_WIDTH_PX: f64 = 60.0;

/// Target features for one synthetic frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticFace {
    pub ear: f64,
    pub mar: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Default for SyntheticFace {
    /// Attentive driver: eyes open, mouth closed, facing the road
    fn default() -> Self {
        Self {
            ear: 0.32,
            mar: 0.1,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
        }
    }
}

impl SyntheticFace {
    pub fn with_ear(self, ear: f64) -> Self {
        Self { ear, ..self }
    }

    pub fn with_mar(self, mar: f64) -> Self {
        Self { mar, ..self }
    }

    pub fn with_pose(self, pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            pitch,
            yaw,
            roll,
            ..self
        }
    }

    /// Render normalized landmarks for an image of the given size
    pub fn landmarks(&self, width: u32, height: u32) -> FaceLandmarks {
        let (w, h) = (f64::from(width), f64::from(height));
        let normalize = |x: f64, y: f64| Point2::new(x / w, y / h);

        // EAR = 4 * half_opening / (2 * eye_width)
        let eye = |cx: f64, cy: f64, outer_on_left: bool| {
            let half = EYE_WIDTH_PX / 2.0;
            let opening = self.ear.max(0.0) * EYE_WIDTH_PX / 2.0;
            let dir = if outer_on_left { 1.0 } else { -1.0 };
            let at = |dx: f64, dy: f64| normalize(cx + dir * dx, cy + dy);
            EyeLandmarks([
                at(-half, 0.0),
                at(-half / 3.0, -opening),
                at(half / 3.0, -opening),
                at(half, 0.0),
                at(half / 3.0, opening),
                at(-half / 3.0, opening),
            ])
        };

        // MAR = 2 * half_opening / mouth_width
        let (mx, my) = (w * 0.5, h * 0.62);
        let lip = self.mar.max(0.0) * MOUTH_WIDTH_PX / 2.0;

        FaceLandmarks {
            right_eye: eye(w * 0.42, h * 0.4, true),
            left_eye: eye(w * 0.58, h * 0.4, false),
            mouth: MouthLandmarks {
                top: normalize(mx, my - lip),
                bottom: normalize(mx, my + lip),
                left: normalize(mx - MOUTH_WIDTH_PX / 2.0, my),
                right: normalize(mx + MOUTH_WIDTH_PX / 2.0, my),
            },
            pose: render_pose_landmarks(self.pitch, self.yaw, self.roll, width, height),
        }
    }

    /// Full frame with this face
    pub fn frame(&self, timestamp: Timestamp, sequence: u64, width: u32, height: u32) -> LandmarkFrame {
        LandmarkFrame::with_face(timestamp, sequence, width, height, self.landmarks(width, height))
    }
}

/// Project the face model under the given Euler angles (degrees)
pub fn render_pose_landmarks(pitch: f64, yaw: f64, roll: f64, width: u32, height: u32) -> PoseLandmarks {
    // A frontal face is the model turned half a turn about x
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw.to_radians())
        * Rotation3::from_axis_angle(&Vector3::y_axis(), pitch.to_radians())
        * Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI + roll.to_radians());
    let translation = Vector3::new(0.0, 0.0, FACE_DISTANCE);
    let intrinsics = CameraIntrinsics::for_image(width, height);

    let [nose_tip, chin, left_eye_outer, right_eye_outer, left_mouth, right_mouth] =
        model_points().map(|m| {
            let px = intrinsics.project(&(rotation * m + translation));
            Point2::new(px.x / f64::from(width), px.y / f64::from(height))
        });

    PoseLandmarks {
        nose_tip,
        chin,
        left_eye_outer,
        right_eye_outer,
        left_mouth,
        right_mouth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{average_ear, pixel_mar};

    #[test]
    fn test_rendered_ratios_match_targets() {
        let face = SyntheticFace::default().with_ear(0.1).with_mar(0.75);
        let landmarks = face.landmarks(640, 480);

        let ear = average_ear(&landmarks.right_eye, &landmarks.left_eye, 640, 480);
        let mar = pixel_mar(&landmarks.mouth, 640, 480);

        assert!((ear - 0.1).abs() < 1e-9);
        assert!((mar - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_frontal_nose_at_image_centre() {
        let pose = render_pose_landmarks(0.0, 0.0, 0.0, 640, 480);
        assert!((pose.nose_tip.x - 0.5).abs() < 1e-9);
        assert!((pose.nose_tip.y - 0.5).abs() < 1e-9);
        // Chin renders below the nose in image coordinates
        assert!(pose.chin.y > pose.nose_tip.y);
    }
}
