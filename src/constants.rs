//! Constants used throughout the application

/// Number of facial landmarks used for the PnP solve
pub const NUM_LANDMARKS: usize = 14;

/// Minimum number of finite correspondences the linear seed solve needs
pub const MIN_CORRESPONDENCES: usize = 6;

/// 3D reference face model, anthropometric coordinates.
/// Index correspondence with the landmark tracker's output ordering is load
/// bearing: any substitute model must keep this ordering.
pub const REFERENCE_MODEL: [[f64; 3]; NUM_LANDMARKS] = [
    [6.825_897, 6.760_612, 4.402_142],   // left brow left corner
    [1.330_353, 7.122_144, 6.903_745],   // left brow right corner
    [-1.330_353, 7.122_144, 6.903_745],  // right brow left corner
    [-6.825_897, 6.760_612, 4.402_142],  // right brow right corner
    [5.311_432, 5.485_328, 3.987_654],   // left eye left corner
    [1.789_930, 5.393_625, 4.413_414],   // left eye right corner
    [-1.789_930, 5.393_625, 4.413_414],  // right eye left corner
    [-5.311_432, 5.485_328, 3.987_654],  // right eye right corner
    [2.005_628, 1.409_845, 6.165_652],   // nose left corner
    [-2.005_628, 1.409_845, 6.165_652],  // nose right corner
    [2.774_015, -2.080_775, 5.048_531],  // mouth left corner
    [-2.774_015, -2.080_775, 5.048_531], // mouth right corner
    [0.0, -3.116_408, 6.097_667],        // mouth central bottom corner
    [0.0, -7.415_691, 4.070_434],        // chin corner
];

/// Default camera intrinsic matrix, row-major, calibrated for a 640x480 webcam
#[rustfmt::skip]
pub const DEFAULT_INTRINSICS: [f64; 9] = [
    653.0839199346667, 0.0,               319.5,
    0.0,               653.0839199346667, 239.5,
    0.0,               0.0,               1.0,
];

/// Default distortion coefficients (k1, k2, p1, p2, k3) for the same camera
pub const DEFAULT_DISTORTION: [f64; 5] = [
    0.070834633684407095,
    0.069140193737175351,
    0.0,
    0.0,
    -1.3073460323689292,
];

/// Wire payload size: 16 IEEE-754 f64 values
pub const TRANSFORM_MESSAGE_LEN: usize = 128;

/// Number of f64 values in a transform payload
pub const TRANSFORM_VALUES: usize = 16;

/// Default publisher bind address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default publisher port
pub const DEFAULT_PORT: u16 = 5555;

/// Default iteration budget for the iterative pose refinement
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default acceptance threshold for RMS reprojection error, in pixels
pub const DEFAULT_MAX_REPROJECTION_ERROR: f64 = 8.0;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
