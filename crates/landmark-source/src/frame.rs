//! Landmark frame types

use serde::{Deserialize, Serialize};

/// Monotonic frame timestamp (nanoseconds since the stream started)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs.max(0.0) * 1e9).round() as u64)
    }

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Seconds elapsed since `earlier`; zero if `earlier` is in the future
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / 1e9
    }

    /// Timestamp advanced by `secs` seconds
    pub fn offset_secs(&self, secs: f64) -> Self {
        Self(self.0 + (secs.max(0.0) * 1e9).round() as u64)
    }
}

/// Normalized 2D landmark point (0..1 relative to image width/height)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to pixel coordinates for an image of the given size
    pub fn to_pixels(&self, width: u32, height: u32) -> Point2 {
        Point2 {
            x: self.x * f64::from(width),
            y: self.y * f64::from(height),
        }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Six eye contour points in P1..P6 order:
/// outer corner, upper lid ×2, inner corner, lower lid ×2
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeLandmarks(pub [Point2; 6]);

/// Inner-lip mouth points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MouthLandmarks {
    pub top: Point2,
    pub bottom: Point2,
    pub left: Point2,
    pub right: Point2,
}

/// Canonical points used for head pose estimation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub nose_tip: Point2,
    pub chin: Point2,
    pub left_eye_outer: Point2,
    pub right_eye_outer: Point2,
    pub left_mouth: Point2,
    pub right_mouth: Point2,
}

impl PoseLandmarks {
    /// Points in the order of the generic 3D face model
    pub fn as_array(&self) -> [Point2; 6] {
        [
            self.nose_tip,
            self.chin,
            self.left_eye_outer,
            self.right_eye_outer,
            self.left_mouth,
            self.right_mouth,
        ]
    }
}

/// Landmarks of the single tracked face
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub right_eye: EyeLandmarks,
    pub left_eye: EyeLandmarks,
    pub mouth: MouthLandmarks,
    pub pose: PoseLandmarks,
}

/// One frame of landmark-detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture timestamp (monotonic)
    pub timestamp: Timestamp,
    /// Frame sequence number
    #[serde(default)]
    pub sequence: u64,
    /// Width of the analysed image (pixels)
    pub image_width: u32,
    /// Height of the analysed image (pixels)
    pub image_height: u32,
    /// Detected face, `None` when no face was found
    #[serde(default)]
    pub face: Option<FaceLandmarks>,
}

impl LandmarkFrame {
    /// Frame with a detected face
    pub fn with_face(
        timestamp: Timestamp,
        sequence: u64,
        image_width: u32,
        image_height: u32,
        face: FaceLandmarks,
    ) -> Self {
        Self {
            timestamp,
            sequence,
            image_width,
            image_height,
            face: Some(face),
        }
    }

    /// Frame where the detector found no face
    pub fn empty(timestamp: Timestamp, sequence: u64, image_width: u32, image_height: u32) -> Self {
        Self {
            timestamp,
            sequence,
            image_width,
            image_height,
            face: None,
        }
    }

    pub fn face_found(&self) -> bool {
        self.face.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let start = Timestamp::from_secs_f64(1.0);
        let later = start.offset_secs(2.5);

        assert!((later.secs_since(start) - 2.5).abs() < 1e-9);
        // Going backwards saturates instead of wrapping
        assert_eq!(start.secs_since(later), 0.0);
    }

    #[test]
    fn test_point_to_pixels() {
        let p = Point2::new(0.5, 0.25).to_pixels(640, 480);
        assert_eq!(p, Point2::new(320.0, 120.0));
        assert!((Point2::new(0.0, 0.0).distance(&Point2::new(3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_frame_deserializes_without_face() {
        let json = r#"{"timestamp":33000000,"image_width":640,"image_height":480}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();

        assert!(!frame.face_found());
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.timestamp, Timestamp::from_nanos(33_000_000));
    }

    proptest! {
        #[test]
        fn elapsed_time_is_never_negative(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let (a, b) = (Timestamp::from_nanos(a), Timestamp::from_nanos(b));
            prop_assert!(a.secs_since(b) >= 0.0);
            prop_assert!(a.secs_since(b) == 0.0 || b.secs_since(a) == 0.0);
        }
    }
}
