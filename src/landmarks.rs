//! Landmark set type and the seam to the external landmark tracker.
//!
//! The facial landmark detector is an external collaborator: every video
//! frame it either yields a fixed-size set of 2D points or nothing at all.
//! [`LandmarkSource`] is that contract; [`JsonlLandmarkSource`] adapts a
//! line-delimited JSON stream (one frame per line) produced by a tracker
//! process, which is also what the integration tests feed the pipeline.

use crate::{constants::NUM_LANDMARKS, Error, Result};
use nalgebra::Vector2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// An ordered set of exactly 14 2D landmark points, index-matched to the
/// reference face model. Produced fresh each frame, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Vector2<f64>; NUM_LANDMARKS],
}

impl LandmarkSet {
    /// Build a landmark set from (x, y) pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless exactly 14 points are given.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {} landmarks, got {}",
                NUM_LANDMARKS,
                points.len()
            )));
        }
        let mut out = [Vector2::zeros(); NUM_LANDMARKS];
        for (dst, &(x, y)) in out.iter_mut().zip(points.iter()) {
            *dst = Vector2::new(x, y);
        }
        Ok(Self { points: out })
    }

    /// The landmark points in model order
    #[must_use]
    pub fn points(&self) -> &[Vector2<f64>; NUM_LANDMARKS] {
        &self.points
    }

    /// Iterate over the landmark points in model order
    pub fn iter(&self) -> impl Iterator<Item = &Vector2<f64>> {
        self.points.iter()
    }
}

/// What the tracker reported for one video frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameObservation {
    /// A face was found and all landmarks located
    Landmarks(LandmarkSet),
    /// No face in this frame; the pipeline skips it
    NoFace,
    /// The source is exhausted (video ended, tracker exited)
    EndOfStream,
}

/// Per-frame landmark supplier, one call per video frame
pub trait LandmarkSource {
    /// Produce the observation for the next frame
    ///
    /// # Errors
    ///
    /// Returns an error only for unrecoverable source failures; transient
    /// per-frame problems are reported as [`FrameObservation::NoFace`].
    fn next_frame(&mut self) -> Result<FrameObservation>;
}

/// Landmark source reading line-delimited JSON from any buffered reader.
///
/// Each line is a JSON array of 14 `[x, y]` pairs; an empty line means the
/// tracker saw no face that frame. Lines that fail to parse are logged and
/// treated as no-face frames so a glitching tracker cannot kill the loop.
pub struct JsonlLandmarkSource<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
}

impl JsonlLandmarkSource<BufReader<File>> {
    /// Open a landmark file, one frame per line
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::InvalidInput(format!("Cannot open {}: {e}", path.as_ref().display()))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlLandmarkSource<R> {
    /// Wrap a buffered reader producing one frame per line
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> LandmarkSource for JsonlLandmarkSource<R> {
    fn next_frame(&mut self) -> Result<FrameObservation> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| Error::InvalidInput(format!("Landmark stream read failed: {e}")))?;
        if n == 0 {
            return Ok(FrameObservation::EndOfStream);
        }
        self.line_no += 1;

        let trimmed = self.line.trim();
        if trimmed.is_empty() {
            return Ok(FrameObservation::NoFace);
        }

        let coords: Vec<[f64; 2]> = match serde_json::from_str(trimmed) {
            Ok(coords) => coords,
            Err(e) => {
                log::warn!("Skipping unparsable landmark line {}: {}", self.line_no, e);
                return Ok(FrameObservation::NoFace);
            }
        };

        let points: Vec<(f64, f64)> = coords.iter().map(|&[x, y]| (x, y)).collect();
        match LandmarkSet::from_points(&points) {
            Ok(set) => Ok(FrameObservation::Landmarks(set)),
            Err(e) => {
                log::warn!("Skipping landmark line {}: {}", self.line_no, e);
                Ok(FrameObservation::NoFace)
            }
        }
    }
}
