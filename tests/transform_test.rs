//! Integration tests for the render transform and its wire format.


use approx::assert_relative_eq;
use head_pose_stream::pose_estimation::Pose;
use head_pose_stream::transform::{axis_fix, RenderTransform};
use head_pose_stream::Error;
use nalgebra::{Matrix4, Vector3};
use test_helpers::{default_estimator, synthetic_landmarks};

#[test]
fn test_solved_pose_round_trips_through_wire() {
    let estimator = default_estimator();
    let landmarks = synthetic_landmarks(
        estimator.calibration(),
        Vector3::new(0.1, -0.2, 0.05),
        Vector3::new(3.0, -1.0, 470.0),
    );
    let pose = estimator.solve(&landmarks).unwrap();

    let transform = RenderTransform::from_pose(&pose);
    let decoded = RenderTransform::from_wire(&transform.to_wire()).unwrap();
    assert_eq!(decoded, transform);
}

#[test]
fn test_identical_landmarks_give_identical_bytes() {
    let estimator = default_estimator();
    let landmarks = synthetic_landmarks(
        estimator.calibration(),
        Vector3::new(0.2, 0.1, 0.0),
        Vector3::new(0.0, 2.0, 510.0),
    );

    let a = RenderTransform::from_pose(&estimator.solve(&landmarks).unwrap()).to_wire();
    let b = RenderTransform::from_pose(&estimator.solve(&landmarks).unwrap()).to_wire();
    assert_eq!(a, b);
}

#[test]
fn test_wire_layout_is_column_major_little_endian() {
    let pose = Pose {
        rotation: Vector3::zeros(),
        translation: Vector3::new(1.0, 2.0, 3.0),
    };
    let bytes = RenderTransform::from_pose(&pose).to_wire();

    // Identity rotation: corrected matrix is diag(1,-1,-1) with the flipped
    // translation in the fourth column
    let expected = [
        1.0, 0.0, 0.0, 0.0, // column 0
        0.0, -1.0, 0.0, 0.0, // column 1
        0.0, 0.0, -1.0, 0.0, // column 2
        1.0, -2.0, -3.0, 1.0, // column 3
    ];
    for (i, value) in expected.iter().enumerate() {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[8 * i..8 * i + 8]);
        assert_eq!(f64::from_le_bytes(raw), *value, "value {i}");
    }
}

#[test]
fn test_axis_correction_undoes_itself() {
    let pose = Pose {
        rotation: Vector3::new(0.3, -0.1, 0.2),
        translation: Vector3::new(5.0, 6.0, 500.0),
    };
    let corrected = *RenderTransform::from_pose(&pose).matrix();
    let mut rigid = Matrix4::identity();
    rigid
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&pose.rotation_matrix());
    rigid
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&pose.translation);

    assert_relative_eq!(axis_fix() * corrected, rigid, epsilon = 1e-12);
}

#[test]
fn test_wire_rejects_truncated_and_oversized() {
    for len in [0usize, 64, 127, 129, 130, 256] {
        let err = RenderTransform::from_wire(&vec![0u8; len]).unwrap_err();
        assert!(
            matches!(err, Error::MalformedMessage { expected: 128, actual } if actual == len),
            "length {len}"
        );
    }
}
