//! Eye and mouth aspect ratios

use landmark_source::{EyeLandmarks, MouthLandmarks, Point2};

/// Eye Aspect Ratio from six contour points in P1..P6 order.
///
/// `EAR = (|P2-P6| + |P3-P5|) / (2 |P1-P4|)`. A zero-width eye yields 0.0.
pub fn eye_aspect_ratio(eye: &[Point2; 6]) -> f64 {
    let [p1, p2, p3, p4, p5, p6] = eye;

    let vertical_1 = p2.distance(p6);
    let vertical_2 = p3.distance(p5);
    let horizontal = p1.distance(p4);

    ratio(vertical_1 + vertical_2, 2.0 * horizontal)
}

/// Mouth Aspect Ratio: `|top-bottom| / |left-right|`. A zero-width mouth yields 0.0.
pub fn mouth_aspect_ratio(mouth: &MouthLandmarks) -> f64 {
    ratio(
        mouth.top.distance(&mouth.bottom),
        mouth.left.distance(&mouth.right),
    )
}

/// Mean EAR of both eyes, computed in pixel space
pub fn average_ear(right: &EyeLandmarks, left: &EyeLandmarks, width: u32, height: u32) -> f64 {
    let to_px = |eye: &EyeLandmarks| eye.0.map(|p| p.to_pixels(width, height));
    (eye_aspect_ratio(&to_px(right)) + eye_aspect_ratio(&to_px(left))) / 2.0
}

/// MAR computed in pixel space
pub fn pixel_mar(mouth: &MouthLandmarks, width: u32, height: u32) -> f64 {
    let px = MouthLandmarks {
        top: mouth.top.to_pixels(width, height),
        bottom: mouth.bottom.to_pixels(width, height),
        left: mouth.left.to_pixels(width, height),
        right: mouth.right.to_pixels(width, height),
    };
    mouth_aspect_ratio(&px)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn eye(width: f64, half_height: f64) -> [Point2; 6] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(width / 3.0, -half_height),
            Point2::new(2.0 * width / 3.0, -half_height),
            Point2::new(width, 0.0),
            Point2::new(2.0 * width / 3.0, half_height),
            Point2::new(width / 3.0, half_height),
        ]
    }

    #[test]
    fn test_ear_closed_form() {
        // Vertical distances 2 + 2, horizontal 6: (2 + 2) / (2 * 6)
        let ear = eye_aspect_ratio(&eye(6.0, 1.0));
        assert!((ear - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ear_zero_width() {
        let mut points = eye(6.0, 1.0);
        points[3] = points[0];
        assert_eq!(eye_aspect_ratio(&points), 0.0);
    }

    #[test]
    fn test_mar_closed_form_and_degenerate() {
        let mouth = MouthLandmarks {
            top: Point2::new(5.0, 0.0),
            bottom: Point2::new(5.0, 4.0),
            left: Point2::new(0.0, 2.0),
            right: Point2::new(10.0, 2.0),
        };
        assert!((mouth_aspect_ratio(&mouth) - 0.4).abs() < 1e-12);

        let closed_corners = MouthLandmarks {
            right: mouth.left,
            ..mouth
        };
        assert_eq!(mouth_aspect_ratio(&closed_corners), 0.0);
    }

    #[test]
    fn test_pixel_space_uses_image_aspect() {
        // Normalized square eye on a 640x480 image is wider than tall in pixels
        let normalized = EyeLandmarks(eye(0.06, 0.01));
        let ear = average_ear(&normalized, &normalized, 640, 480);
        let expected = (4.0 * 0.01 * 480.0) / (2.0 * 0.06 * 640.0);
        assert!((ear - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn ear_is_finite_and_non_negative(
            coords in proptest::collection::vec(-1.0e3f64..1.0e3, 12)
        ) {
            let points: Vec<Point2> = coords.chunks(2).map(|c| Point2::new(c[0], c[1])).collect();
            let eye: [Point2; 6] = [points[0], points[1], points[2], points[3], points[4], points[5]];
            let ear = eye_aspect_ratio(&eye);
            prop_assert!(ear.is_finite());
            prop_assert!(ear >= 0.0);
        }
    }
}
