use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tolerance::Tolerances;

#[derive(Debug, Error)]
pub enum ConfigErrors {
    #[error("inertia about axis {axis} must be positive, got {value}")]
    InertiaNotPositive { axis: usize, value: f64 },
    #[error("{name} must be positive, got {value}")]
    CostNotPositive { name: &'static str, value: f64 },
    #[error("sample period must be positive, got {0}")]
    SamplePeriodNotPositive(f64),
    #[error("mean motion must be finite, got {0}")]
    MeanMotionNotFinite(f64),
    #[error("newton tolerance must be positive, got {0}")]
    ToleranceNotPositive(f64),
    #[error("newton iteration budget must be at least one")]
    NoNewtonIterations,
    #[error("minimum field norm must be finite and non-negative, got {0}")]
    FieldThresholdInvalid(f64),
    #[error("minimum pivot ratio must lie in [0, 1), got {0}")]
    PivotRatioInvalid(f64),
    #[error("could not parse controller config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("could not read controller config: {0}")]
    Io(#[from] std::io::Error),
}

/// Physical constants, cost weights and solver limits of the controller.
///
/// Defaults describe the MiTEE-2 cubesat in a ~360 km circular orbit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Orbital mean motion (rad/s).
    pub mean_motion: f64,
    /// Principal moments of inertia J1, J2, J3 (kg m^2).
    pub inertia: [f64; 3],
    /// Control sample period (s).
    pub sample_period: f64,
    pub position_cost: f64,
    pub velocity_cost: f64,
    pub input_cost: f64,
    pub newton_tolerance: f64,
    pub max_newton_iterations: usize,
    /// Fields at or below this norm (T) give no usable actuation authority.
    pub min_field_norm: f64,
    /// Smallest accepted ratio of the smallest to the largest LU pivot magnitude.
    pub min_pivot_ratio: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mean_motion: 1.144035952968e-3,
            inertia: [3.196587857e-2, 3.229090604e-2, 7.02534780e-3],
            sample_period: 4.0,
            position_cost: 1.5e-7,
            velocity_cost: 1.5e-3,
            input_cost: 1e7,
            newton_tolerance: 1e-3,
            max_newton_iterations: 100,
            min_field_norm: 1e-8,
            min_pivot_ratio: 1e-12,
        }
    }
}

impl ControllerConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigErrors> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigErrors> {
        let s = std::fs::read_to_string(path)?;
        Self::from_ron_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigErrors> {
        for (axis, &value) in self.inertia.iter().enumerate() {
            if !is_positive(value) {
                return Err(ConfigErrors::InertiaNotPositive { axis, value });
            }
        }
        for (name, value) in [
            ("position cost", self.position_cost),
            ("velocity cost", self.velocity_cost),
            ("input cost", self.input_cost),
        ] {
            if !is_positive(value) {
                return Err(ConfigErrors::CostNotPositive { name, value });
            }
        }
        if !is_positive(self.sample_period) {
            return Err(ConfigErrors::SamplePeriodNotPositive(self.sample_period));
        }
        // zero is allowed here, it is reported as a singular A_c downstream
        if !self.mean_motion.is_finite() {
            return Err(ConfigErrors::MeanMotionNotFinite(self.mean_motion));
        }
        if !is_positive(self.newton_tolerance) {
            return Err(ConfigErrors::ToleranceNotPositive(self.newton_tolerance));
        }
        if self.max_newton_iterations == 0 {
            return Err(ConfigErrors::NoNewtonIterations);
        }
        if !(self.min_field_norm.is_finite() && self.min_field_norm >= 0.0) {
            return Err(ConfigErrors::FieldThresholdInvalid(self.min_field_norm));
        }
        if !(0.0..1.0).contains(&self.min_pivot_ratio) {
            return Err(ConfigErrors::PivotRatioInvalid(self.min_pivot_ratio));
        }
        Ok(())
    }

    pub fn tolerances(&self) -> Result<Tolerances, ConfigErrors> {
        Tolerances::new(self.newton_tolerance)
            .ok_or(ConfigErrors::ToleranceNotPositive(self.newton_tolerance))
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
