//! Conversion from camera-frame poses to render-convention transforms.
//!
//! The solver's coordinate frame has +y down and +z into the scene; render
//! conventions want +y up and +z toward the viewer. A fixed sign-flip matrix
//! applied from the left converts between the two. The corrected 4x4 matrix
//! is also the wire payload: 16 f64 values, column-major, little-endian.

use crate::{
    constants::{TRANSFORM_MESSAGE_LEN, TRANSFORM_VALUES},
    pose_estimation::Pose,
    Error, Result,
};
use nalgebra::Matrix4;

/// Sign-flip matrix converting camera-vision axes to render axes.
///
/// Involutive: applying it twice restores the original matrix.
#[must_use]
pub fn axis_fix() -> Matrix4<f64> {
    Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, -1.0, -1.0, 1.0))
}

/// A head transform in render coordinates, ready for broadcast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    matrix: Matrix4<f64>,
}

impl RenderTransform {
    /// Build the render transform for a solved pose
    #[must_use]
    pub fn from_pose(pose: &Pose) -> Self {
        let r = pose.rotation_matrix();
        let t = pose.translation;
        let mut rigid = Matrix4::identity();
        rigid.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        rigid.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
        Self {
            matrix: axis_fix() * rigid,
        }
    }

    /// The corrected 4x4 matrix
    #[must_use]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Serialize to the fixed 128-byte wire message
    #[must_use]
    pub fn to_wire(&self) -> [u8; TRANSFORM_MESSAGE_LEN] {
        let mut buf = [0u8; TRANSFORM_MESSAGE_LEN];
        for (chunk, value) in buf.chunks_exact_mut(8).zip(self.matrix.as_slice()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        buf
    }

    /// Deserialize a wire message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedMessage`] unless `bytes` is exactly 128
    /// bytes long.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TRANSFORM_MESSAGE_LEN {
            return Err(Error::MalformedMessage {
                expected: TRANSFORM_MESSAGE_LEN,
                actual: bytes.len(),
            });
        }
        let mut values = [0.0f64; TRANSFORM_VALUES];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *value = f64::from_le_bytes(raw);
        }
        Ok(Self {
            matrix: Matrix4::from_column_slice(&values),
        })
    }
}
