//! Camera calibration model: intrinsic matrix plus distortion coefficients.

use crate::{constants::EPSILON, rotation::rodrigues_to_matrix, Error, Result};
use nalgebra::{Matrix3, Vector2, Vector3};

/// Immutable camera calibration, loaded once at startup.
///
/// Holds a 3x3 pinhole intrinsic matrix and the 5-element distortion vector
/// `(k1, k2, p1, p2, k3)` in the usual radial/tangential ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    intrinsics: Matrix3<f64>,
    distortion: [f64; 5],
}

impl CameraCalibration {
    /// Create a calibration from an intrinsic matrix and distortion vector
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] if the intrinsic matrix is singular or
    /// contains non-finite values.
    pub fn new(intrinsics: Matrix3<f64>, distortion: [f64; 5]) -> Result<Self> {
        if intrinsics.iter().any(|v| !v.is_finite()) {
            return Err(Error::Calibration(
                "intrinsic matrix contains non-finite values".to_string(),
            ));
        }
        if intrinsics.determinant().abs() < EPSILON {
            return Err(Error::Calibration(
                "intrinsic matrix is singular".to_string(),
            ));
        }
        if distortion.iter().any(|v| !v.is_finite()) {
            return Err(Error::Calibration(
                "distortion coefficients contain non-finite values".to_string(),
            ));
        }
        Ok(Self {
            intrinsics,
            distortion,
        })
    }

    /// Create a calibration from a row-major 9-element intrinsics slice
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] if the intrinsic matrix is singular.
    pub fn from_arrays(intrinsics: &[f64; 9], distortion: &[f64; 5]) -> Result<Self> {
        Self::new(Matrix3::from_row_slice(intrinsics), *distortion)
    }

    /// The 3x3 intrinsic matrix
    #[must_use]
    pub fn intrinsics(&self) -> &Matrix3<f64> {
        &self.intrinsics
    }

    /// The distortion coefficients (k1, k2, p1, p2, k3)
    #[must_use]
    pub fn distortion(&self) -> &[f64; 5] {
        &self.distortion
    }

    /// Inverse of the intrinsic matrix, used to normalize pixel coordinates
    #[must_use]
    pub fn intrinsics_inv(&self) -> Matrix3<f64> {
        // Constructor guarantees invertibility
        self.intrinsics
            .try_inverse()
            .unwrap_or_else(Matrix3::identity)
    }

    /// Project a 3D model point into pixel coordinates through a pose given
    /// as Rodrigues rotation and translation vectors.
    #[must_use]
    pub fn project_point(
        &self,
        rvec: &Vector3<f64>,
        tvec: &Vector3<f64>,
        point: &Vector3<f64>,
    ) -> Vector2<f64> {
        let cam = rodrigues_to_matrix(rvec) * point + tvec;
        self.project_camera_point(&cam)
    }

    /// Project a point already expressed in the camera frame.
    ///
    /// Applies the full radial/tangential distortion model before the pinhole
    /// mapping. Points at (or numerically behind) zero depth produce a far
    /// off-image coordinate rather than a division blow-up, which keeps the
    /// solver residuals finite.
    #[must_use]
    pub fn project_camera_point(&self, cam: &Vector3<f64>) -> Vector2<f64> {
        let z = if cam.z.abs() < EPSILON {
            EPSILON
        } else {
            cam.z
        };
        let x = cam.x / z;
        let y = cam.y / z;

        let [k1, k2, p1, p2, k3] = self.distortion;
        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

        let fx = self.intrinsics[(0, 0)];
        let fy = self.intrinsics[(1, 1)];
        let cx = self.intrinsics[(0, 2)];
        let cy = self.intrinsics[(1, 2)];
        Vector2::new(fx * xd + cx, fy * yd + cy)
    }
}

impl Default for CameraCalibration {
    fn default() -> Self {
        use crate::constants::{DEFAULT_DISTORTION, DEFAULT_INTRINSICS};
        // Compiled-in defaults are a valid calibration
        Self::from_arrays(&DEFAULT_INTRINSICS, &DEFAULT_DISTORTION)
            .unwrap_or_else(|_| unreachable!("default calibration is non-singular"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_singular_intrinsics_rejected() {
        let result = CameraCalibration::new(Matrix3::zeros(), [0.0; 5]);
        assert!(matches!(result, Err(Error::Calibration(_))));
    }

    #[test]
    fn test_default_calibration_valid() {
        let cal = CameraCalibration::default();
        assert_relative_eq!(cal.intrinsics()[(2, 2)], 1.0);
    }

    #[test]
    fn test_projection_principal_point() {
        // A point on the optical axis projects to the principal point
        let cal = CameraCalibration::default();
        let uv = cal.project_point(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 500.0),
            &Vector3::zeros(),
        );
        assert_relative_eq!(uv.x, cal.intrinsics()[(0, 2)], epsilon = 1e-9);
        assert_relative_eq!(uv.y, cal.intrinsics()[(1, 2)], epsilon = 1e-9);
    }

    #[test]
    fn test_projection_no_distortion_matches_pinhole() {
        let intrinsics = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let cal = CameraCalibration::new(intrinsics, [0.0; 5]).unwrap();
        let uv = cal.project_camera_point(&Vector3::new(1.0, -0.5, 10.0));
        assert_relative_eq!(uv.x, 320.0 + 800.0 * 0.1, epsilon = 1e-9);
        assert_relative_eq!(uv.y, 240.0 - 800.0 * 0.05, epsilon = 1e-9);
    }
}
