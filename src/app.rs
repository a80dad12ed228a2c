//! The per-frame pipeline: landmarks in, broadcast transform out.

use crate::{
    config::Config,
    landmarks::{FrameObservation, LandmarkSource},
    pose_estimation::PoseEstimator,
    streaming::PosePublisher,
    transform::RenderTransform,
    Error, Result,
};

/// What a single frame produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Pose solved and broadcast
    Published,
    /// No face in this frame; nothing broadcast
    NoFace,
    /// Landmarks present but no acceptable pose; nothing broadcast
    Unsolvable,
    /// The landmark source is exhausted
    EndOfStream,
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub published: u64,
    pub no_face: u64,
    pub unsolvable: u64,
}

/// Drives the estimate-transform-broadcast loop over a landmark source
pub struct HeadPoseApp<S: LandmarkSource> {
    source: S,
    estimator: PoseEstimator,
    publisher: PosePublisher,
    stats: FrameStats,
}

impl<S: LandmarkSource> HeadPoseApp<S> {
    /// Bind the broadcast endpoint and assemble the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::Transport`] if the endpoint cannot be bound.
    pub fn new(config: &Config, source: S) -> Result<Self> {
        config.validate()?;
        let estimator = PoseEstimator::new(config.to_calibration()?, &config.solver);
        let publisher = PosePublisher::bind(config.transport.endpoint())?;
        Ok(Self {
            source,
            estimator,
            publisher,
            stats: FrameStats::default(),
        })
    }

    /// Counters for the frames processed so far
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// The broadcast side of the pipeline
    #[must_use]
    pub fn publisher(&self) -> &PosePublisher {
        &self.publisher
    }

    /// Process one frame from the source.
    ///
    /// A frame without a solvable pose is skipped, not fatal; the loop
    /// recovers on the next frame. Transport and input errors propagate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] or [`Error::Transport`] for failures
    /// that cannot be recovered per-frame.
    pub fn process_frame(&mut self) -> Result<FrameOutcome> {
        let observation = self.source.next_frame()?;
        let landmarks = match observation {
            FrameObservation::Landmarks(landmarks) => landmarks,
            FrameObservation::NoFace => {
                self.stats.frames += 1;
                self.stats.no_face += 1;
                return Ok(FrameOutcome::NoFace);
            }
            FrameObservation::EndOfStream => return Ok(FrameOutcome::EndOfStream),
        };
        self.stats.frames += 1;

        let pose = match self.estimator.solve(&landmarks) {
            Ok(pose) => pose,
            Err(Error::PoseUnsolvable(reason)) => {
                log::debug!("Skipping frame {}: {reason}", self.stats.frames);
                self.stats.unsolvable += 1;
                return Ok(FrameOutcome::Unsolvable);
            }
            Err(e) => return Err(e),
        };

        let [pitch, yaw, roll] = pose.euler_angles();
        log::debug!("Pose: pitch {pitch:.1}, yaw {yaw:.1}, roll {roll:.1} deg");

        let transform = RenderTransform::from_pose(&pose);
        let delivered = self.publisher.publish(&transform);
        log::trace!("Delivered frame {} to {delivered} subscribers", self.stats.frames);
        self.stats.published += 1;
        Ok(FrameOutcome::Published)
    }

    /// Run until the landmark source is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates the first unrecoverable error from [`Self::process_frame`].
    pub fn run(&mut self) -> Result<FrameStats> {
        loop {
            if self.process_frame()? == FrameOutcome::EndOfStream {
                break;
            }
        }
        let stats = self.stats;
        log::info!(
            "Processed {} frames: {} published, {} without a face, {} unsolvable",
            stats.frames,
            stats.published,
            stats.no_face,
            stats.unsolvable
        );
        Ok(stats)
    }
}
