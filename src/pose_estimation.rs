//! Head pose estimation from 2D/3D point correspondences.
//!
//! Solves the perspective-n-point problem for the 14-point reference face
//! model: a normalized direct linear solve seeds a Levenberg-Marquardt
//! refinement that minimizes pixel reprojection error through the full
//! distortion model. Every frame is an independent solve; a frame that fails
//! simply produces no pose.

use crate::{
    calibration::CameraCalibration,
    config::SolverConfig,
    constants::{MIN_CORRESPONDENCES, NUM_LANDMARKS, REFERENCE_MODEL},
    landmarks::LandmarkSet,
    rotation::{matrix_to_rodrigues, rodrigues_to_matrix},
    Error, Result,
};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Matrix3, Matrix3x4, Matrix4, Vector2, Vector3};

/// Camera-frame pose for a single frame: Rodrigues rotation and translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Rotation in axis-angle (Rodrigues) form
    pub rotation: Vector3<f64>,
    /// Translation in camera units (same scale as the reference model)
    pub translation: Vector3<f64>,
}

impl Pose {
    /// Expand the rotation vector into a 3x3 rotation matrix
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rodrigues_to_matrix(&self.rotation)
    }

    /// Euler angles (pitch, yaw, roll) in degrees, for diagnostics
    #[must_use]
    pub fn euler_angles(&self) -> [f64; 3] {
        let r = self.rotation_matrix();
        let pitch = (-r[(1, 2)]).asin();
        let yaw = r[(0, 2)].atan2(r[(2, 2)]);
        let roll = r[(1, 0)].atan2(r[(1, 1)]);
        [pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()]
    }
}

/// Head pose estimator using a DLT-seeded iterative PnP solve
pub struct PoseEstimator {
    model: [Vector3<f64>; NUM_LANDMARKS],
    calibration: CameraCalibration,
    max_iterations: usize,
    max_reprojection_error: f64,
}

impl PoseEstimator {
    /// Create an estimator over the compiled-in reference face model
    #[must_use]
    pub fn new(calibration: CameraCalibration, solver: &SolverConfig) -> Self {
        Self::with_model(&REFERENCE_MODEL, calibration, solver)
    }

    /// Create an estimator with a substitute model.
    ///
    /// The substitute must preserve the index correspondence with the
    /// landmark tracker's output ordering.
    #[must_use]
    pub fn with_model(
        model: &[[f64; 3]; NUM_LANDMARKS],
        calibration: CameraCalibration,
        solver: &SolverConfig,
    ) -> Self {
        let mut points = [Vector3::zeros(); NUM_LANDMARKS];
        for (dst, src) in points.iter_mut().zip(model.iter()) {
            *dst = Vector3::new(src[0], src[1], src[2]);
        }
        Self {
            model: points,
            calibration,
            max_iterations: solver.max_iterations,
            max_reprojection_error: solver.max_reprojection_error,
        }
    }

    /// The calibration this estimator projects through
    #[must_use]
    pub fn calibration(&self) -> &CameraCalibration {
        &self.calibration
    }

    /// Estimate the head pose from one frame's landmarks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoseUnsolvable`] when too few finite correspondences
    /// remain, the linear seed is degenerate, or the refinement does not
    /// reach an acceptable reprojection error within the iteration budget.
    pub fn solve(&self, landmarks: &LandmarkSet) -> Result<Pose> {
        let mut object = Vec::with_capacity(NUM_LANDMARKS);
        let mut image = Vec::with_capacity(NUM_LANDMARKS);
        for (p3, p2) in self.model.iter().zip(landmarks.iter()) {
            if p2.x.is_finite() && p2.y.is_finite() {
                object.push(*p3);
                image.push(*p2);
            }
        }
        if object.len() < MIN_CORRESPONDENCES {
            return Err(Error::PoseUnsolvable(format!(
                "only {} valid correspondences, need at least {}",
                object.len(),
                MIN_CORRESPONDENCES
            )));
        }

        let (r_seed, t_seed) = dlt_seed(&object, &image, &self.calibration)?;
        let rvec_seed = matrix_to_rodrigues(&r_seed);

        let mut params = DVector::zeros(6);
        params.fixed_rows_mut::<3>(0).copy_from(&rvec_seed);
        params.fixed_rows_mut::<3>(3).copy_from(&t_seed);

        let problem = ReprojectionProblem {
            object: &object,
            image: &image,
            calibration: &self.calibration,
            params,
        };
        let lm = LevenbergMarquardt::new().with_patience(self.max_iterations);
        let (problem, report) = lm.minimize(problem);
        let x = problem.params;

        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::PoseUnsolvable(
                "refinement diverged to non-finite parameters".to_string(),
            ));
        }

        let residuals = reprojection_residuals(&object, &image, &self.calibration, &x);
        let rms = (residuals.norm_squared() / object.len() as f64).sqrt();
        log::trace!(
            "PnP refinement: {} evaluations, rms {:.4} px, converged: {}",
            report.number_of_evaluations,
            rms,
            report.termination.was_successful()
        );

        if rms > self.max_reprojection_error {
            return Err(Error::PoseUnsolvable(format!(
                "reprojection error {rms:.2} px exceeds limit {:.2} px",
                self.max_reprojection_error
            )));
        }

        let pose = Pose {
            rotation: Vector3::new(x[0], x[1], x[2]),
            translation: Vector3::new(x[3], x[4], x[5]),
        };
        if pose.translation.z <= 0.0 {
            return Err(Error::PoseUnsolvable(
                "solution places the face behind the camera".to_string(),
            ));
        }
        Ok(pose)
    }
}

/// Residual vector (projected minus observed, 2 entries per point) at the
/// pose packed as `[rvec, tvec]`
fn reprojection_residuals(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    calibration: &CameraCalibration,
    x: &DVector<f64>,
) -> DVector<f64> {
    let r = rodrigues_to_matrix(&Vector3::new(x[0], x[1], x[2]));
    let t = Vector3::new(x[3], x[4], x[5]);
    let mut out = DVector::zeros(2 * object.len());
    for (i, (p, obs)) in object.iter().zip(image.iter()).enumerate() {
        let uv = calibration.project_camera_point(&(r * p + t));
        out[2 * i] = uv.x - obs.x;
        out[2 * i + 1] = uv.y - obs.y;
    }
    out
}

/// Nonlinear reprojection problem over the 6 pose parameters
struct ReprojectionProblem<'a> {
    object: &'a [Vector3<f64>],
    image: &'a [Vector2<f64>],
    calibration: &'a CameraCalibration,
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for ReprojectionProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(reprojection_residuals(
            self.object,
            self.image,
            self.calibration,
            &self.params,
        ))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        // Central differences over the 6 pose parameters
        let rows = 2 * self.object.len();
        let mut jac = DMatrix::zeros(rows, 6);
        for j in 0..6 {
            let step = 1e-6 * (1.0 + self.params[j].abs());
            let mut forward = self.params.clone();
            forward[j] += step;
            let mut backward = self.params.clone();
            backward[j] -= step;
            let rf = reprojection_residuals(self.object, self.image, self.calibration, &forward);
            let rb = reprojection_residuals(self.object, self.image, self.calibration, &backward);
            for i in 0..rows {
                jac[(i, j)] = (rf[i] - rb[i]) / (2.0 * step);
            }
        }
        Some(jac)
    }
}

/// Direct linear PnP seed: normalized DLT with the rotation projected onto
/// SO(3).
///
/// Works on undistorted normalized image coordinates, so the seed ignores
/// lens distortion; the LM refinement accounts for it.
fn dlt_seed(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    calibration: &CameraCalibration,
) -> Result<(Matrix3<f64>, Vector3<f64>)> {
    let n = object.len();
    debug_assert!(n >= MIN_CORRESPONDENCES);
    let k_inv = calibration.intrinsics_inv();

    // Normalize the 3D points: centroid at the origin, mean distance sqrt(3)
    let centroid = object.iter().sum::<Vector3<f64>>() / n as f64;
    let mean_dist = object.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n as f64;
    if mean_dist < crate::constants::EPSILON {
        return Err(Error::PoseUnsolvable(
            "degenerate 3D point configuration".to_string(),
        ));
    }
    let scale = 3.0_f64.sqrt() / mean_dist;
    #[rustfmt::skip]
    let t_world = Matrix4::new(
        scale, 0.0,   0.0,   -scale * centroid.x,
        0.0,   scale, 0.0,   -scale * centroid.y,
        0.0,   0.0,   scale, -scale * centroid.z,
        0.0,   0.0,   0.0,   1.0,
    );

    // Build the 2n x 12 homogeneous system for P = [R | t]
    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (pw, pi)) in object.iter().zip(image.iter()).enumerate() {
        let pn = (pw - centroid) * scale;

        // Normalized image point x_n = K^-1 [u, v, 1]^T
        let v_img = k_inv * Vector3::new(pi.x, pi.y, 1.0);
        let u = v_img.x / v_img.z;
        let v = v_img.y / v_img.z;

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = pn.x;
        a[(r0, 1)] = pn.y;
        a[(r0, 2)] = pn.z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * pn.x;
        a[(r0, 9)] = -u * pn.y;
        a[(r0, 10)] = -u * pn.z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = pn.x;
        a[(r1, 5)] = pn.y;
        a[(r1, 6)] = pn.z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * pn.x;
        a[(r1, 9)] = -v * pn.y;
        a[(r1, 10)] = -v * pn.z;
        a[(r1, 11)] = -v;
    }

    // Solve A p = 0: singular vector of the smallest singular value
    let svd = a.svd(true, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::PoseUnsolvable("SVD failed in DLT seed".to_string()))?;
    let p_row = v_t.row(v_t.nrows() - 1).transpose();
    let p_norm = Matrix3x4::from_row_slice(p_row.as_slice());

    // Undo the 3D normalization: P = P_norm * T_world
    let p_mtx = p_norm * t_world;

    let m = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s < crate::constants::EPSILON {
        return Err(Error::PoseUnsolvable(
            "ill-conditioned system in DLT seed".to_string(),
        ));
    }
    if m.determinant() < 0.0 {
        s = -s;
    }
    let r_approx = m / s;

    // Project onto SO(3)
    let svd3 = r_approx.svd(true, true);
    let (u3, v3_t) = match (svd3.u, svd3.v_t) {
        (Some(u3), Some(v3_t)) => (u3, v3_t),
        _ => return Err(Error::PoseUnsolvable("SVD failed in DLT seed".to_string())),
    };
    let mut r_orth = u3 * v3_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u3;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v3_t;
    }

    let t = p_mtx.column(3).into_owned() / s;
    Ok((r_orth, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_estimator() -> PoseEstimator {
        PoseEstimator::new(CameraCalibration::default(), &SolverConfig::default())
    }

    fn project_model(estimator: &PoseEstimator, rvec: Vector3<f64>, tvec: Vector3<f64>) -> LandmarkSet {
        let points: Vec<(f64, f64)> = REFERENCE_MODEL
            .iter()
            .map(|p| {
                let uv = estimator.calibration().project_point(
                    &rvec,
                    &tvec,
                    &Vector3::new(p[0], p[1], p[2]),
                );
                (uv.x, uv.y)
            })
            .collect();
        LandmarkSet::from_points(&points).unwrap()
    }

    #[test]
    fn test_recovers_frontal_pose() {
        let estimator = default_estimator();
        let tvec = Vector3::new(0.0, 0.0, 500.0);
        let landmarks = project_model(&estimator, Vector3::zeros(), tvec);

        let pose = estimator.solve(&landmarks).unwrap();
        assert_relative_eq!(pose.rotation, Vector3::zeros(), epsilon = 1e-3);
        assert_relative_eq!(pose.translation, tvec, max_relative = 1e-3);
    }

    #[test]
    fn test_recovers_rotated_pose() {
        let estimator = default_estimator();
        let rvec = Vector3::new(0.15, -0.25, 0.1);
        let tvec = Vector3::new(3.0, -2.0, 420.0);
        let landmarks = project_model(&estimator, rvec, tvec);

        let pose = estimator.solve(&landmarks).unwrap();
        assert_relative_eq!(pose.rotation, rvec, epsilon = 1e-4);
        assert_relative_eq!(pose.translation, tvec, max_relative = 1e-4);
    }

    #[test]
    fn test_too_few_valid_correspondences() {
        let estimator = default_estimator();
        let mut points: Vec<(f64, f64)> = vec![(f64::NAN, f64::NAN); NUM_LANDMARKS];
        points[0] = (100.0, 100.0);
        points[1] = (200.0, 100.0);
        points[2] = (150.0, 200.0);
        let landmarks = LandmarkSet::from_points(&points).unwrap();

        assert!(matches!(
            estimator.solve(&landmarks),
            Err(Error::PoseUnsolvable(_))
        ));
    }

    #[test]
    fn test_degenerate_identical_landmarks() {
        let estimator = default_estimator();
        let points: Vec<(f64, f64)> = vec![(320.0, 240.0); NUM_LANDMARKS];
        let landmarks = LandmarkSet::from_points(&points).unwrap();

        assert!(matches!(
            estimator.solve(&landmarks),
            Err(Error::PoseUnsolvable(_))
        ));
    }

    #[test]
    fn test_euler_angles_identity() {
        let pose = Pose {
            rotation: Vector3::zeros(),
            translation: Vector3::new(0.0, 0.0, 500.0),
        };
        let angles = pose.euler_angles();
        for angle in angles {
            assert!(angle.abs() < 1e-6);
        }
    }
}
