//! Head pose estimation (perspective-n-point against a generic face model)
//!
//! The six canonical landmarks are matched to a fixed 3D face model. An
//! initial camera pose comes from the direct linear transform, then a
//! Levenberg-Marquardt pass minimises the reprojection error. Euler angles
//! are read off the rotation matrix:
//!
//! - `pitch = asin(-R[2,0])`
//! - `yaw   = atan2(R[1,0], R[0,0])`
//! - `roll  = atan2(R[2,1], R[2,2])`, folded into (-90, 90]
//!
//! Any solve failure yields a zero pose rather than an error.

use landmark_source::{Point2, PoseLandmarks};
use nalgebra::{DMatrix, Matrix3, Rotation3, SMatrix, SVector, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Generic 3D face model: nose tip, chin, left/right eye outer corner,
/// left/right mouth corner. The model z axis points towards the camera.
pub const FACE_MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

const POINTS: usize = 6;
const RESIDUALS: usize = 2 * POINTS;

/// Head pose (Euler angles, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Why a pose solve was abandoned
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("Image has zero size")]
    EmptyImage,

    #[error("Landmarks are degenerate (collinear or coincident)")]
    Degenerate,

    #[error("Linear solve failed: {0}")]
    LinearSolve(&'static str),

    #[error("Face model lies behind the camera")]
    BehindCamera,

    #[error("Non-finite pose")]
    NonFinite,
}

/// Pinhole intrinsics estimated from the image size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Focal length = image width, principal point = image centre, no distortion
    pub fn for_image(width: u32, height: u32) -> Self {
        Self {
            focal_length: f64::from(width),
            cx: f64::from(width) / 2.0,
            cy: f64::from(height) / 2.0,
        }
    }

    fn normalize(&self, px: &Point2) -> (f64, f64) {
        (
            (px.x - self.cx) / self.focal_length,
            (px.y - self.cy) / self.focal_length,
        )
    }

    /// Project a camera-frame point to pixels
    pub fn project(&self, p: &Vector3<f64>) -> Point2 {
        Point2::new(
            self.focal_length * p.x / p.z + self.cx,
            self.focal_length * p.y / p.z + self.cy,
        )
    }
}

/// Solved camera pose of the face model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSolution {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
    /// RMS reprojection error in normalized image units
    pub rms_error: f64,
}

/// Perspective-n-point solver for the six-point face model
#[derive(Debug, Clone)]
pub struct PoseSolver {
    /// Maximum Levenberg-Marquardt iterations
    pub max_iterations: usize,
}

impl Default for PoseSolver {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

impl PoseSolver {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Estimate the head pose, falling back to (0, 0, 0) when the solve fails
    pub fn estimate(&self, landmarks: &PoseLandmarks, width: u32, height: u32) -> HeadPose {
        match self.solve(landmarks, width, height) {
            Ok(solution) => {
                let pose = euler_angles(&solution.rotation);
                if pose.pitch.is_finite() && pose.yaw.is_finite() && pose.roll.is_finite() {
                    pose
                } else {
                    debug!("Pose solve produced non-finite angles");
                    HeadPose::default()
                }
            }
            Err(e) => {
                debug!("Head pose unavailable: {}", e);
                HeadPose::default()
            }
        }
    }

    /// Solve the camera pose from normalized landmarks on an image of the given size
    pub fn solve(
        &self,
        landmarks: &PoseLandmarks,
        width: u32,
        height: u32,
    ) -> Result<PoseSolution, PoseError> {
        if width == 0 || height == 0 {
            return Err(PoseError::EmptyImage);
        }

        let intrinsics = CameraIntrinsics::for_image(width, height);
        let image: Vec<(f64, f64)> = landmarks
            .as_array()
            .iter()
            .map(|p| intrinsics.normalize(&p.to_pixels(width, height)))
            .collect();

        if image.iter().any(|(u, v)| !u.is_finite() || !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }
        if is_degenerate(&image) {
            return Err(PoseError::Degenerate);
        }

        let model = model_points();
        let (rotation, translation) = direct_linear_transform(&model, &image)?;
        let solution = self.refine(&model, &image, rotation, translation);

        if !solution.rms_error.is_finite() || solution.translation.iter().any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }
        Ok(solution)
    }

    fn refine(
        &self,
        model: &[Vector3<f64>; POINTS],
        image: &[(f64, f64)],
        rotation: Rotation3<f64>,
        translation: Vector3<f64>,
    ) -> PoseSolution {
        let w = rotation.scaled_axis();
        let mut params = Vector6::new(w.x, w.y, w.z, translation.x, translation.y, translation.z);
        let mut residual = residuals(&params, model, image);
        let mut cost = residual.norm_squared();
        let mut lambda = 1e-3;

        for _ in 0..self.max_iterations {
            if cost < 1e-20 {
                break;
            }

            let jacobian = numeric_jacobian(&params, model, image, &residual);
            let jt = jacobian.transpose();
            let hessian = jt * jacobian;
            let gradient = jt * residual;

            let mut improved = false;
            while lambda < 1e10 {
                let mut damped = hessian;
                for i in 0..6 {
                    damped[(i, i)] += lambda * hessian[(i, i)].max(1e-12);
                }
                let Some(step) = damped.cholesky().map(|c| c.solve(&(-gradient))) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate = params + step;
                let candidate_residual = residuals(&candidate, model, image);
                let candidate_cost = candidate_residual.norm_squared();

                if candidate_cost < cost {
                    params = candidate;
                    residual = candidate_residual;
                    cost = candidate_cost;
                    lambda = (lambda / 10.0).max(1e-12);
                    improved = step.norm() > 1e-12;
                    break;
                }
                lambda *= 10.0;
            }

            if !improved {
                break;
            }
        }

        PoseSolution {
            rotation: Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2])),
            translation: Vector3::new(params[3], params[4], params[5]),
            rms_error: (cost / POINTS as f64).sqrt(),
        }
    }
}

/// Euler angles in degrees from a rotation, roll folded into (-90, 90]
pub fn euler_angles(rotation: &Rotation3<f64>) -> HeadPose {
    let r = rotation.matrix();
    let pitch = (-r[(2, 0)]).clamp(-1.0, 1.0).asin();
    let yaw = r[(1, 0)].atan2(r[(0, 0)]);
    let roll = r[(2, 1)].atan2(r[(2, 2)]);

    HeadPose {
        pitch: pitch.to_degrees(),
        yaw: yaw.to_degrees(),
        roll: fold_half_turn(roll.to_degrees()),
    }
}

/// The face model looks down -z of the camera when frontal, which puts the
/// raw roll near ±180°. Fold it so a frontal face reads 0°.
fn fold_half_turn(degrees: f64) -> f64 {
    if degrees > 90.0 {
        degrees - 180.0
    } else if degrees <= -90.0 {
        degrees + 180.0
    } else {
        degrees
    }
}

pub(crate) fn model_points() -> [Vector3<f64>; POINTS] {
    FACE_MODEL_POINTS.map(|[x, y, z]| Vector3::new(x, y, z))
}

fn is_degenerate(image: &[(f64, f64)]) -> bool {
    let n = image.len() as f64;
    let (mx, my) = image
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (u, v)| (sx + u / n, sy + v / n));

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (u, v) in image {
        let (dx, dy) = (u - mx, v - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    // Eigenvalues of the 2x2 scatter matrix
    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let disc = ((trace * trace) / 4.0 - det).max(0.0).sqrt();
    let major = trace / 2.0 + disc;
    let minor = trace / 2.0 - disc;

    major < 1e-12 || minor < major * 1e-8
}

fn direct_linear_transform(
    model: &[Vector3<f64>; POINTS],
    image: &[(f64, f64)],
) -> Result<(Rotation3<f64>, Vector3<f64>), PoseError> {
    let mut a = DMatrix::<f64>::zeros(RESIDUALS, 12);
    for (i, (m, &(u, v))) in model.iter().zip(image).enumerate() {
        let row = 2 * i;
        let x = [m.x, m.y, m.z, 1.0];
        for k in 0..4 {
            a[(row, k)] = x[k];
            a[(row, 8 + k)] = -u * x[k];
            a[(row + 1, 4 + k)] = x[k];
            a[(row + 1, 8 + k)] = -v * x[k];
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(PoseError::LinearSolve("projection SVD"))?;
    let (null_index, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or(PoseError::LinearSolve("empty SVD"))?;
    let p = v_t.row(null_index);

    let mut m = Matrix3::new(p[0], p[1], p[2], p[4], p[5], p[6], p[8], p[9], p[10]);
    let mut t = Vector3::new(p[3], p[7], p[11]);
    if m.determinant() < 0.0 {
        m = -m;
        t = -t;
    }

    // Closest rotation to the (scaled) left 3x3 block
    let svd_m = m.svd(true, true);
    let (u, v_t) = match (svd_m.u, svd_m.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(PoseError::LinearSolve("rotation SVD")),
    };
    let scale = svd_m.singular_values.sum() / 3.0;
    if !(scale > f64::EPSILON) {
        return Err(PoseError::Degenerate);
    }

    let r = u * v_t;
    if r.determinant() <= 0.0 {
        return Err(PoseError::Degenerate);
    }

    let translation = t / scale;
    if translation.z <= 0.0 {
        return Err(PoseError::BehindCamera);
    }

    Ok((Rotation3::from_matrix_unchecked(r), translation))
}

fn residuals(
    params: &Vector6<f64>,
    model: &[Vector3<f64>; POINTS],
    image: &[(f64, f64)],
) -> SVector<f64, RESIDUALS> {
    let rotation = Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
    let translation = Vector3::new(params[3], params[4], params[5]);

    let mut r = SVector::<f64, RESIDUALS>::zeros();
    for (i, (m, &(u, v))) in model.iter().zip(image).enumerate() {
        let c = rotation.transform_vector(m) + translation;
        // Points behind the camera get a large, smooth penalty
        let z = if c.z > 1e-9 { c.z } else { 1e-9 };
        r[2 * i] = c.x / z - u;
        r[2 * i + 1] = c.y / z - v;
    }
    r
}

fn numeric_jacobian(
    params: &Vector6<f64>,
    model: &[Vector3<f64>; POINTS],
    image: &[(f64, f64)],
    base: &SVector<f64, RESIDUALS>,
) -> SMatrix<f64, RESIDUALS, 6> {
    let mut jacobian = SMatrix::<f64, RESIDUALS, 6>::zeros();
    for j in 0..6 {
        let h = 1e-7 * params[j].abs().max(1.0);
        let mut shifted = *params;
        shifted[j] += h;
        let column = (residuals(&shifted, model, image) - base) / h;
        jacobian.set_column(j, &column);
    }
    jacobian
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::render_pose_landmarks;

    const WIDTH: u32 = 640;
    const HEIGHT: u32 = 480;

    fn assert_pose(actual: HeadPose, pitch: f64, yaw: f64, roll: f64) {
        assert!((actual.pitch - pitch).abs() < 0.5, "pitch {:?}", actual);
        assert!((actual.yaw - yaw).abs() < 0.5, "yaw {:?}", actual);
        assert!((actual.roll - roll).abs() < 0.5, "roll {:?}", actual);
    }

    #[test]
    fn test_frontal_face_reads_zero() {
        let landmarks = render_pose_landmarks(0.0, 0.0, 0.0, WIDTH, HEIGHT);
        let pose = PoseSolver::default().estimate(&landmarks, WIDTH, HEIGHT);
        assert_pose(pose, 0.0, 0.0, 0.0);
    }

    #[test]
    fn test_recovers_rotated_pose() {
        let landmarks = render_pose_landmarks(12.0, -20.0, 15.0, WIDTH, HEIGHT);
        let solution = PoseSolver::default().solve(&landmarks, WIDTH, HEIGHT).unwrap();

        assert!(solution.rms_error < 1e-6);
        assert_pose(euler_angles(&solution.rotation), 12.0, -20.0, 15.0);
    }

    #[test]
    fn test_collinear_points_fall_back_to_zero() {
        let p = |x: f64| Point2::new(x, 0.5);
        let landmarks = PoseLandmarks {
            nose_tip: p(0.1),
            chin: p(0.2),
            left_eye_outer: p(0.3),
            right_eye_outer: p(0.4),
            left_mouth: p(0.5),
            right_mouth: p(0.6),
        };

        let solver = PoseSolver::default();
        assert_eq!(solver.solve(&landmarks, WIDTH, HEIGHT), Err(PoseError::Degenerate));
        assert_eq!(solver.estimate(&landmarks, WIDTH, HEIGHT), HeadPose::default());
    }

    #[test]
    fn test_zero_sized_image() {
        let landmarks = render_pose_landmarks(0.0, 0.0, 0.0, WIDTH, HEIGHT);
        assert_eq!(
            PoseSolver::default().solve(&landmarks, 0, 0),
            Err(PoseError::EmptyImage)
        );
    }

    #[test]
    fn test_fold_half_turn() {
        assert_eq!(fold_half_turn(179.0), -1.0);
        assert_eq!(fold_half_turn(-170.0), 10.0);
        assert_eq!(fold_half_turn(45.0), 45.0);
    }
}
