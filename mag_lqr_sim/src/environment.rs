use magnetic_lqr::{AttitudeSensors, MagneticTorquers};
use magnetics::{MagneticErrors, MagneticField};
use nalgebra::{Matrix3, Matrix6, Matrix6x3, Vector3, Vector6};
use rand::{SeedableRng, rngs::SmallRng};
use rand_distr::{Distribution, Normal, NormalError};
use thiserror::Error;

use crate::config::SimConfig;

/// Gravitational parameter of the earth (m^3/s^2).
pub const EARTH_MU: f64 = 3.986004415e14;

#[derive(Debug, Error)]
pub enum EnvironmentErrors {
    #[error("{0}")]
    Magnetic(#[from] MagneticErrors),
    #[error("mean motion must be positive to place a circular orbit, got {0}")]
    NoOrbit(f64),
    #[error("invalid magnetometer noise: {0}")]
    Noise(#[from] NormalError),
}

/// Circular orbit with the ascending node on the inertial x axis.
#[derive(Clone, Copy, Debug)]
pub struct CircularOrbit {
    radius: f64,
    mean_motion: f64,
    inclination: f64,
    phase: f64,
}

impl CircularOrbit {
    pub fn new(mean_motion: f64, inclination_deg: f64, phase_deg: f64) -> Result<Self, EnvironmentErrors> {
        if !(mean_motion.is_finite() && mean_motion > 0.0) {
            return Err(EnvironmentErrors::NoOrbit(mean_motion));
        }
        Ok(Self {
            radius: (EARTH_MU / (mean_motion * mean_motion)).cbrt(),
            mean_motion,
            inclination: inclination_deg.to_radians(),
            phase: phase_deg.to_radians(),
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn argument_of_latitude(&self, t: f64) -> f64 {
        self.phase + self.mean_motion * t
    }

    pub fn position(&self, t: f64) -> Vector3<f64> {
        self.radius * self.radial(t)
    }

    fn radial(&self, t: f64) -> Vector3<f64> {
        let (su, cu) = self.argument_of_latitude(t).sin_cos();
        let (si, ci) = self.inclination.sin_cos();
        Vector3::new(cu, su * ci, su * si)
    }

    fn along_track(&self, t: f64) -> Vector3<f64> {
        let (su, cu) = self.argument_of_latitude(t).sin_cos();
        let (si, ci) = self.inclination.sin_cos();
        Vector3::new(-su, cu * ci, cu * si)
    }

    /// Inertial to LVLH rotation: x along track, y anti orbit normal, z nadir.
    pub fn lvlh_rotation(&self, t: f64) -> Matrix3<f64> {
        let r = self.radial(t);
        let v = self.along_track(t);
        let h = r.cross(&v);
        Matrix3::from_rows(&[v.transpose(), (-h).transpose(), (-r).transpose()])
    }
}

/// Truth model of the spacecraft: linearized attitude plant, dipole field
/// and a noisy magnetometer.
///
/// Earth rotation is neglected, so the field is sampled at the inertial
/// position directly.
#[derive(Clone, Debug)]
pub struct Spacecraft {
    field: MagneticField,
    orbit: CircularOrbit,
    mean_motion: f64,
    x: Vector6<f64>,
    true_field: Vector3<f64>,
    measured_field: Vector3<f64>,
    noise: Normal<f64>,
    rng: SmallRng,
}

impl Spacecraft {
    pub fn new(config: &SimConfig, seed: u64) -> Result<Self, EnvironmentErrors> {
        let mean_motion = config.controller.mean_motion;
        let orbit = CircularOrbit::new(
            mean_motion,
            config.orbit.inclination_deg,
            config.orbit.phase_deg,
        )?;
        tracing::debug!(radius = orbit.radius(), "circular orbit");
        Ok(Self {
            field: MagneticField::default(),
            orbit,
            mean_motion,
            x: Vector6::from(config.initial_state),
            true_field: Vector3::zeros(),
            measured_field: Vector3::zeros(),
            noise: Normal::new(0.0, config.magnetometer_noise)?,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Deviation from the gravity-gradient equilibrium.
    pub fn state(&self) -> &Vector6<f64> {
        &self.x
    }

    /// Field in the body frame without sensor noise (T).
    pub fn true_field(&self) -> &Vector3<f64> {
        &self.true_field
    }

    /// Samples the field at time t into the body frame and takes a
    /// magnetometer reading.
    pub fn sense(&mut self, t: f64) -> Result<(), EnvironmentErrors> {
        let b_inertial = self.field.calculate(&self.orbit.position(t))?;
        let b_lvlh = self.orbit.lvlh_rotation(t) * b_inertial;
        let attitude = Vector3::new(self.x[0], self.x[1], self.x[2]);
        // small angle LVLH to body rotation
        self.true_field = (Matrix3::identity() - attitude.cross_matrix()) * b_lvlh;

        let noise = Vector3::from_fn(|_, _| self.noise.sample(&mut self.rng));
        self.measured_field = self.true_field + noise;
        Ok(())
    }

    /// Advances one sample period holding the dipole constant.
    pub fn propagate(&mut self, a_d: &Matrix6<f64>, b_d: &Matrix6x3<f64>, dipole: &Vector3<f64>) {
        self.x = a_d * self.x + b_d * dipole;
    }
}

impl AttitudeSensors for Spacecraft {
    fn angular_position(&self) -> Vector3<f64> {
        Vector3::new(self.x[0], self.x[1], self.x[2])
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        Vector3::new(self.x[3], self.x[4] - self.mean_motion, self.x[5])
    }

    fn magnetic_field(&self) -> Vector3<f64> {
        self.measured_field
    }
}

/// Ideal torquer set: the last commanded dipole is applied for the whole sample.
#[derive(Clone, Debug, Default)]
pub struct Torquers {
    pub dipole: Vector3<f64>,
    pub commands: usize,
}

impl MagneticTorquers for Torquers {
    fn command_dipole(&mut self, dipole: &Vector3<f64>) {
        self.dipole = *dipole;
        self.commands += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use utilities::assert_matrix_equal_reltol;

    const N: f64 = 1.144035952968e-3;

    #[test]
    fn orbit_radius_from_mean_motion() {
        let orbit = CircularOrbit::new(N, 51.6, 0.0).unwrap();
        assert!(orbit.radius() > 6.7e6 && orbit.radius() < 6.76e6);
        assert_relative_eq!(
            N * N * orbit.radius().powi(3),
            EARTH_MU,
            max_relative = 1e-12
        );
        assert_relative_eq!(orbit.position(1234.0).norm(), orbit.radius(), max_relative = 1e-12);
    }

    #[test]
    fn orbit_requires_positive_mean_motion() {
        assert!(matches!(
            CircularOrbit::new(0.0, 0.0, 0.0),
            Err(EnvironmentErrors::NoOrbit(_))
        ));
    }

    #[test]
    fn lvlh_axes_equatorial() {
        let orbit = CircularOrbit::new(N, 0.0, 0.0).unwrap();
        let rotation = orbit.lvlh_rotation(0.0);
        #[rustfmt::skip]
        let expected = Matrix3::new(
             0.0, 1.0,  0.0,
             0.0, 0.0, -1.0,
            -1.0, 0.0,  0.0,
        );
        assert_matrix_equal_reltol(rotation.as_slice(), expected.as_slice(), 1e-15);
    }

    #[test]
    fn lvlh_rotation_is_proper() {
        let orbit = CircularOrbit::new(N, 51.6, 30.0).unwrap();
        for t in [0.0, 500.0, 2750.0] {
            let rotation = orbit.lvlh_rotation(t);
            let identity = rotation * rotation.transpose();
            assert_matrix_equal_reltol(identity.as_slice(), Matrix3::<f64>::identity().as_slice(), 1e-14);
            assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn noiseless_magnetometer_reads_truth() {
        let config = SimConfig {
            magnetometer_noise: 0.0,
            ..Default::default()
        };
        let mut spacecraft = Spacecraft::new(&config, 0).unwrap();
        spacecraft.sense(100.0).unwrap();
        assert_eq!(spacecraft.magnetic_field(), *spacecraft.true_field());
        let norm = spacecraft.true_field().norm();
        assert!(norm > 1e-5 && norm < 1e-4);
    }

    #[test]
    fn noise_is_seeded() {
        let config = SimConfig::default();
        let mut a = Spacecraft::new(&config, 7).unwrap();
        let mut b = Spacecraft::new(&config, 7).unwrap();
        let mut c = Spacecraft::new(&config, 8).unwrap();
        a.sense(0.0).unwrap();
        b.sense(0.0).unwrap();
        c.sense(0.0).unwrap();
        assert_eq!(a.magnetic_field(), b.magnetic_field());
        assert_ne!(a.magnetic_field(), c.magnetic_field());
        assert_eq!(a.true_field(), c.true_field());
    }

    #[test]
    fn sensors_report_inertial_pitch_rate() {
        let config = SimConfig {
            initial_state: [0.1, 0.2, 0.3, 1e-3, 2e-3, 3e-3],
            ..Default::default()
        };
        let spacecraft = Spacecraft::new(&config, 0).unwrap();
        assert_eq!(spacecraft.angular_position(), Vector3::new(0.1, 0.2, 0.3));
        let velocity = spacecraft.angular_velocity();
        assert_eq!(velocity[0], 1e-3);
        assert_eq!(velocity[1], 2e-3 - N);
        assert_eq!(velocity[2], 3e-3);
    }

    #[test]
    fn torquers_latch_last_command() {
        let mut torquers = Torquers::default();
        torquers.command_dipole(&Vector3::new(1.0, 2.0, 3.0));
        torquers.command_dipole(&Vector3::new(-1.0, 0.0, 0.5));
        assert_eq!(torquers.dipole, Vector3::new(-1.0, 0.0, 0.5));
        assert_eq!(torquers.commands, 2);
    }
}
