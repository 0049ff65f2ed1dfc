use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DipoleErrors {
    #[error("reference radius must be positive, got {0}")]
    RadiusNotPositive(f64),
    #[error("cannot evaluate the dipole field at its center")]
    AtCenter,
}

/// Mean radius used with the IGRF Gauss coefficients (m).
pub const EARTH_REFERENCE_RADIUS: f64 = 6.3712e6;

/// IGRF-12 degree 1 coefficients at epoch 2015 (nT): [g10, g11], h11.
pub const EARTH_DIPOLE_G: [f64; 2] = [-29442.0, -1501.0];
pub const EARTH_DIPOLE_H: f64 = 4797.1;

/// Centered magnetic dipole.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dipole {
    m: Vector3<f64>, // T m^3
}

impl Dipole {
    /// Builds the dipole from degree 1 Gauss coefficients (nT) at reference radius `a` (m).
    pub fn from_gh(a: f64, g: [f64; 2], h: f64) -> Result<Self, DipoleErrors> {
        if !(a > 0.0) {
            return Err(DipoleErrors::RadiusNotPositive(a));
        }
        let nt_to_tesla = 1e-9;
        let m = nt_to_tesla * a.powi(3) * Vector3::new(g[1], h, g[0]);
        Ok(Self { m })
    }

    pub fn earth() -> Self {
        Self {
            m: 1e-9
                * EARTH_REFERENCE_RADIUS.powi(3)
                * Vector3::new(EARTH_DIPOLE_G[1], EARTH_DIPOLE_H, EARTH_DIPOLE_G[0]),
        }
    }

    pub fn moment(&self) -> &Vector3<f64> {
        &self.m
    }

    /// Field in Tesla at position `r` (m) in the planet-fixed frame.
    pub fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, DipoleErrors> {
        let rm = r.magnitude();
        if rm <= f64::EPSILON {
            return Err(DipoleErrors::AtCenter);
        }
        Ok((3.0 * self.m.dot(r) * r - rm.powi(2) * self.m) / rm.powi(5))
    }
}
