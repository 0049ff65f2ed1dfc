use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod dipole;

use dipole::{Dipole, DipoleErrors};

#[derive(Debug, Error)]
pub enum MagneticErrors {
    #[error("DipoleErrors: {0}")]
    DipoleErrors(#[from] DipoleErrors),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MagneticField {
    Dipole(Dipole),
}

impl MagneticField {
    /// Field vector in Tesla at the planet-fixed position `r` (m).
    pub fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, MagneticErrors> {
        match self {
            MagneticField::Dipole(b) => Ok(b.calculate(r)?),
        }
    }
}

impl Default for MagneticField {
    fn default() -> Self {
        MagneticField::Dipole(Dipole::earth())
    }
}
