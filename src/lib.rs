//! Real-time head pose estimation and streaming.
//!
//! This library turns per-frame 2D facial landmarks into a stream of 4x4
//! head transforms:
//! 1. A `PnP` (Perspective-n-Point) solve recovers the head's rotation and
//!    translation from 14 tracked landmarks and a fixed 3D face model
//! 2. The pose is converted into a render-convention 4x4 matrix
//! 3. The matrix is broadcast to any number of TCP subscribers, fire and
//!    forget
//!
//! Landmark tracking itself is out of scope; landmarks arrive through the
//! [`landmarks::LandmarkSource`] trait, with a JSON-lines reader provided
//! for files and pipes.
//!
//! # Examples
//!
//! ```no_run
//! use head_pose_stream::{
//!     app::{FrameOutcome, HeadPoseApp},
//!     config::Config,
//!     landmarks::JsonlLandmarkSource,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("config.yaml")?;
//! let source = JsonlLandmarkSource::open("landmarks.jsonl")?;
//!
//! let mut app = HeadPoseApp::new(&config, source)?;
//! loop {
//!     match app.process_frame()? {
//!         FrameOutcome::Published => {}
//!         FrameOutcome::NoFace | FrameOutcome::Unsolvable => {}
//!         FrameOutcome::EndOfStream => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Receiving the stream:
//!
//! ```no_run
//! use head_pose_stream::streaming::PoseSubscriber;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut subscriber = PoseSubscriber::connect("127.0.0.1:5555")?;
//! loop {
//!     if let Some(transform) = subscriber.latest()? {
//!         println!("{}", transform.matrix());
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok(())
//! # }
//! ```

/// Camera intrinsics and the projection/distortion model
pub mod calibration;

/// Configuration management
pub mod config;

/// Constants used throughout the pipeline
pub mod constants;

/// Error types and result handling
pub mod error;

/// Landmark sets and landmark sources
pub mod landmarks;

/// Head pose estimation using the `PnP` algorithm
pub mod pose_estimation;

/// Rodrigues rotation vector conversions
pub mod rotation;

/// TCP broadcast of render transforms
pub mod streaming;

/// Camera-to-render coordinate conversion and the wire format
pub mod transform;

/// Main application module
pub mod app;

pub use error::{Error, Result};
