//! YAML configuration for the pipeline.
//!
//! Every field has a default matching the reference capture rig, so an
//! empty file (or no file at all) yields a working configuration.

use crate::{
    calibration::CameraCalibration,
    constants::{
        DEFAULT_BIND_ADDR, DEFAULT_DISTORTION, DEFAULT_INTRINSICS, DEFAULT_MAX_ITERATIONS,
        DEFAULT_MAX_REPROJECTION_ERROR, DEFAULT_PORT,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head pose streaming configuration

calibration:
  # Camera matrix, row-major: fx 0 cx / 0 fy cy / 0 0 1
  intrinsics: [653.0839199346667, 0.0, 319.5,
               0.0, 653.0839199346667, 239.5,
               0.0, 0.0, 1.0]
  # Lens distortion (k1, k2, p1, p2, k3)
  distortion: [0.070834633684407095, 0.069140193737175351, 0.0, 0.0, -1.3073460323689292]

solver:
  max_iterations: 100
  max_reprojection_error: 8.0

transport:
  bind_addr: "0.0.0.0"
  port: 5555
"#;

/// Camera calibration parameters as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Camera matrix, row-major
    pub intrinsics: [f64; 9],
    /// Distortion coefficients (k1, k2, p1, p2, k3)
    pub distortion: [f64; 5],
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            intrinsics: DEFAULT_INTRINSICS,
            distortion: DEFAULT_DISTORTION,
        }
    }
}

/// PnP solver settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration budget for the refinement
    pub max_iterations: usize,
    /// Largest acceptable RMS reprojection error, in pixels
    pub max_reprojection_error: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_reprojection_error: DEFAULT_MAX_REPROJECTION_ERROR,
        }
    }
}

/// Broadcast endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Interface to listen on
    pub bind_addr: String,
    /// TCP port for subscribers
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl TransportConfig {
    /// The bind endpoint as `addr:port`
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub calibration: CalibrationConfig,
    pub solver: SolverConfig,
    pub transport: TransportConfig,
}

impl Config {
    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Cannot read {}: {e}", path.as_ref().display())))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Cannot parse {}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Cannot serialize configuration: {e}")))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Cannot write {}: {e}", path.as_ref().display())))
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.to_calibration()
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.solver.max_iterations == 0 {
            return Err(Error::Config(
                "solver.max_iterations must be positive".to_string(),
            ));
        }
        if !(self.solver.max_reprojection_error > 0.0) {
            return Err(Error::Config(
                "solver.max_reprojection_error must be positive".to_string(),
            ));
        }
        if self.transport.bind_addr.is_empty() {
            return Err(Error::Config("transport.bind_addr is empty".to_string()));
        }
        Ok(())
    }

    /// Build the camera calibration described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Calibration`] if the intrinsics are singular or
    /// non-finite.
    pub fn to_calibration(&self) -> Result<CameraCalibration> {
        CameraCalibration::from_arrays(&self.calibration.intrinsics, &self.calibration.distortion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.endpoint(), "0.0.0.0:5555");
    }

    #[test]
    fn test_example_config_parses_to_default() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = serde_yaml::from_str("transport:\n  port: 6000\n").unwrap();
        assert_eq!(config.transport.port, 6000);
        assert_eq!(config.transport.bind_addr, "0.0.0.0");
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn test_rejects_singular_intrinsics() {
        let mut config = Config::default();
        config.calibration.intrinsics = [0.0; 9];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let mut config = Config::default();
        config.solver.max_iterations = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
