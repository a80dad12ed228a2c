//! Rodrigues (axis-angle) rotation utilities.
//!
//! The solver works with 3-parameter rotation vectors; the frame converter
//! needs the full 3x3 matrix. Both directions are exact: matrix -> vector ->
//! matrix round-trips within floating point tolerance.

use nalgebra::{Matrix3, Vector3};

/// Small angle threshold for numerical stability
const SMALL_ANGLE_THRESHOLD: f64 = 1e-8;

/// Constructs the skew-symmetric matrix [v]x such that [v]x u = v x u.
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// Expands a Rodrigues rotation vector into a 3x3 rotation matrix.
///
/// `R = I + sin(t)/t [r]x + (1 - cos(t))/t^2 [r]x^2` with `t = |r|`; the
/// small-angle branch uses the first-order expansion `I + [r]x`.
pub fn rodrigues_to_matrix(rvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta = rvec.norm();
    if theta < SMALL_ANGLE_THRESHOLD {
        return Matrix3::identity() + skew(rvec);
    }

    let k = skew(rvec);
    let k_sq = k * k;
    Matrix3::identity() + (theta.sin() / theta) * k + ((1.0 - theta.cos()) / (theta * theta)) * k_sq
}

/// Recovers the Rodrigues rotation vector from a rotation matrix.
///
/// Inverse of [`rodrigues_to_matrix`] for proper rotations. Handles the
/// small-angle case and the singular neighborhood of theta = pi.
pub fn matrix_to_rodrigues(r: &Matrix3<f64>) -> Vector3<f64> {
    let cos_theta = ((r.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();

    // Twice the axis scaled by sin(theta), from the antisymmetric part
    let v = Vector3::new(
        r[(2, 1)] - r[(1, 2)],
        r[(0, 2)] - r[(2, 0)],
        r[(1, 0)] - r[(0, 1)],
    );

    if theta < SMALL_ANGLE_THRESHOLD {
        return v * 0.5;
    }

    let sin_theta = theta.sin();
    if sin_theta.abs() > 1e-6 {
        return v * (theta / (2.0 * sin_theta));
    }

    // theta near pi: the antisymmetric part vanishes, extract the axis from
    // the symmetric part (R + I)/2 = axis axis^T near the singularity.
    let a = (r + Matrix3::identity()) * 0.5;
    let diag = Vector3::new(a[(0, 0)], a[(1, 1)], a[(2, 2)]);
    let i = diag.imax();
    let mut axis = Vector3::zeros();
    axis[i] = diag[i].max(0.0).sqrt();
    if axis[i] > 0.0 {
        for j in 0..3 {
            if j != i {
                axis[j] = a[(i, j)] / axis[i];
            }
        }
    }
    let norm = axis.norm();
    if norm > 0.0 {
        axis /= norm;
    }
    axis * theta
}
