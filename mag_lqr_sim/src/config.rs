use std::path::Path;

use magnetic_lqr::{ConfigErrors, ControllerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimConfigErrors {
    #[error("{0}")]
    Controller(#[from] ConfigErrors),
    #[error("magnetometer noise must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("could not parse simulation config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("could not read simulation config: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub inclination_deg: f64,
    /// Argument of latitude at t = 0.
    pub phase_deg: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            inclination_deg: 51.6,
            phase_deg: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub controller: ControllerConfig,
    pub orbit: OrbitConfig,
    /// Initial deviation [roll, pitch, yaw, roll rate, pitch rate, yaw rate].
    pub initial_state: [f64; 6],
    /// 1-sigma magnetometer noise per axis (T).
    pub magnetometer_noise: f64,
    pub cycles: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            orbit: OrbitConfig::default(),
            initial_state: [0.05, -0.03, 0.02, 1e-4, -5e-5, 2e-4],
            magnetometer_noise: 1e-7,
            cycles: 1400,
        }
    }
}

impl SimConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimConfigErrors> {
        let s = std::fs::read_to_string(path)?;
        Self::from_ron_str(&s)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, SimConfigErrors> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimConfigErrors> {
        self.controller.validate()?;
        if !(self.magnetometer_noise.is_finite() && self.magnetometer_noise >= 0.0) {
            return Err(SimConfigErrors::InvalidNoise(self.magnetometer_noise));
        }
        Ok(())
    }
}
