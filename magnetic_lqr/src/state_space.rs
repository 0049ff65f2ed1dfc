use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::{config::ControllerConfig, LqrErrors};

/// Time-invariant part of the linearized attitude model.
///
/// The state is the deviation from the gravity-gradient equilibrium,
/// x = [roll, pitch, yaw, roll rate, pitch rate, yaw rate].
#[derive(Clone, Debug)]
pub struct StateSpaceModel {
    a_c: Matrix6<f64>,
    a_d: Matrix6<f64>,
    q: Matrix6<f64>,
    r: Matrix3<f64>,
    j: Matrix3<f64>,
    mean_motion: f64,
    sample_period: f64,
}

impl StateSpaceModel {
    pub fn new(config: &ControllerConfig) -> Result<Self, LqrErrors> {
        config.validate()?;

        let a_c = continuous_dynamics(config.mean_motion, &config.inertia);
        // A_d = e^(A_c * T)
        let a_d = (a_c * config.sample_period).exp();

        let p = config.position_cost;
        let v = config.velocity_cost;
        let q = Matrix6::from_diagonal(&Vector6::new(p, p, p, v, v, v));
        let r = Matrix3::from_diagonal_element(config.input_cost);
        let j = Matrix3::from_diagonal(&Vector3::from(config.inertia));

        Ok(Self {
            a_c,
            a_d,
            q,
            r,
            j,
            mean_motion: config.mean_motion,
            sample_period: config.sample_period,
        })
    }

    pub fn a_c(&self) -> &Matrix6<f64> {
        &self.a_c
    }

    pub fn a_d(&self) -> &Matrix6<f64> {
        &self.a_d
    }

    pub fn q(&self) -> &Matrix6<f64> {
        &self.q
    }

    pub fn r(&self) -> &Matrix3<f64> {
        &self.r
    }

    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.j
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn sample_period(&self) -> f64 {
        self.sample_period
    }
}

/// Attitude kinematics and gravity-gradient coupling about the
/// local-vertical/local-horizontal equilibrium for orbit rate `n`.
pub fn continuous_dynamics(n: f64, inertia: &[f64; 3]) -> Matrix6<f64> {
    let [j1, j2, j3] = *inertia;
    let j12 = (j1 - j2) / j3;
    let j23 = (j2 - j3) / j1;
    let j31 = (j3 - j1) / j2;

    #[rustfmt::skip]
    let a_c = Matrix6::new(
        0.0,                0.0,               n,   1.0,       0.0, 0.0,
        0.0,                0.0,               0.0, 0.0,       1.0, 0.0,
        -n,                 0.0,               0.0, 0.0,       0.0, 1.0,
        -3.0 * n * n * j23, 0.0,               0.0, 0.0,       0.0, -n * j23,
        0.0,                3.0 * n * n * j31, 0.0, 0.0,       0.0, 0.0,
        0.0,                0.0,               0.0, -n * j12,  0.0, 0.0,
    );
    a_c
}
