use nalgebra::{Matrix3, Matrix3x6, Matrix6, Matrix6x3, Vector3, Vector6};

use crate::{
    config::ControllerConfig,
    gain::{command, compute_gain},
    hardware::{AttitudeSensors, MagneticTorquers},
    input_matrix::InputMatrixBuilder,
    riccati::RiccatiSolver,
    state_space::StateSpaceModel,
    LqrErrors,
};

/// Actuation applied after a cycle fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultResponse {
    /// Re-send the previous dipole command.
    HoldCommand,
    /// Apply the last valid gain to the new state.
    RetainGain,
    /// Command zero dipole.
    Idle,
}

/// Per-cycle quantities, overwritten once per control sample.
#[derive(Clone, Debug, Default)]
pub struct ControllerState {
    pub cycle: u64,
    /// Deviation from the gravity-gradient equilibrium.
    pub x: Vector6<f64>,
    pub b: Vector3<f64>,
    pub skew: Matrix3<f64>,
    pub b_c: Matrix6x3<f64>,
    pub b_d: Matrix6x3<f64>,
    pub p: Matrix6<f64>,
    pub k: Matrix3x6<f64>,
    pub u: Vector3<f64>,
    /// False until the first successful gain update.
    pub gain_valid: bool,
    pub newton_iterations: usize,
}

/// Time-varying LQR controller for magnetorquer actuation.
///
/// All constant matrices and solver scratch are built in `new`. Per-cycle
/// methods take `&mut self`, so one controller serves one caller at a time.
#[derive(Clone, Debug)]
pub struct Controller {
    config: ControllerConfig,
    model: StateSpaceModel,
    input: InputMatrixBuilder,
    solver: RiccatiSolver,
    pub state: ControllerState,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Result<Self, LqrErrors> {
        let model = StateSpaceModel::new(&config)?;
        let input = InputMatrixBuilder::new(&model, &config)?;
        let solver = RiccatiSolver::new(&model, &config)?;
        Ok(Self {
            config,
            model,
            input,
            solver,
            state: ControllerState::default(),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn model(&self) -> &StateSpaceModel {
        &self.model
    }

    pub fn input_matrices(&self) -> &InputMatrixBuilder {
        &self.input
    }

    pub fn solver(&self) -> &RiccatiSolver {
        &self.solver
    }

    /// Reads the sensors into x and b.
    ///
    /// The equilibrium spins about -y at the orbit rate, so the mean motion is
    /// added to the measured pitch rate to form the deviation state.
    pub fn update_sensors<S: AttitudeSensors + ?Sized>(&mut self, sensors: &S) {
        let position = sensors.angular_position();
        let velocity = sensors.angular_velocity();
        let mut x = Vector6::new(
            position[0],
            position[1],
            position[2],
            velocity[0],
            velocity[1],
            velocity[2],
        );
        x[4] += self.model.mean_motion();

        self.state.x = x;
        self.state.b = sensors.magnetic_field();
    }

    /// Sets the deviation state and field directly.
    pub fn set_measurement(&mut self, x: Vector6<f64>, b: Vector3<f64>) {
        self.state.x = x;
        self.state.b = b;
    }

    /// Rebuilds B(t), solves for P(t) and computes K(t) from the stored field.
    ///
    /// The per-cycle matrices are only replaced when every stage succeeds.
    pub fn update_gain(&mut self) -> Result<&Matrix3x6<f64>, LqrErrors> {
        let inputs = self.input.build(&self.state.b)?;
        let p = self.solver.solve(&inputs.discrete)?;
        let k = compute_gain(
            &p,
            self.model.a_d(),
            &inputs.discrete,
            self.model.r(),
            self.config.min_pivot_ratio,
        )?;

        self.state.skew = inputs.skew;
        self.state.b_c = inputs.continuous;
        self.state.b_d = inputs.discrete;
        self.state.p = p;
        self.state.k = k;
        self.state.gain_valid = true;
        self.state.newton_iterations = self.solver.newton().iterations();
        Ok(&self.state.k)
    }

    /// u = -K x with the current gain and state.
    pub fn command(&mut self) -> Vector3<f64> {
        self.state.u = command(&self.state.k, &self.state.x);
        self.state.u
    }

    pub fn send_command<A: MagneticTorquers + ?Sized>(&self, actuators: &mut A) {
        actuators.command_dipole(&self.state.u);
    }

    /// One full control cycle: sensors, gain, command, actuators.
    ///
    /// Errors are returned untouched; nothing is sent to the actuators when
    /// the cycle fails. See [`Controller::recover`].
    pub fn step<S, A>(&mut self, sensors: &S, actuators: &mut A) -> Result<Vector3<f64>, LqrErrors>
    where
        S: AttitudeSensors + ?Sized,
        A: MagneticTorquers + ?Sized,
    {
        self.state.cycle += 1;
        self.update_sensors(sensors);
        self.update_gain()?;
        let u = self.command();
        self.send_command(actuators);
        tracing::debug!(
            cycle = self.state.cycle,
            iterations = self.state.newton_iterations,
            u = ?u.as_slice(),
            "control cycle"
        );
        Ok(u)
    }

    /// Applies the fault response for a failed cycle and returns the one taken.
    pub fn recover<A: MagneticTorquers + ?Sized>(
        &mut self,
        error: &LqrErrors,
        actuators: &mut A,
    ) -> Option<FaultResponse> {
        let response = match error.response()? {
            FaultResponse::RetainGain if !self.state.gain_valid => FaultResponse::Idle,
            response => response,
        };
        match response {
            FaultResponse::HoldCommand => {}
            FaultResponse::RetainGain => {
                self.state.u = command(&self.state.k, &self.state.x);
            }
            FaultResponse::Idle => {
                self.state.u = Vector3::zeros();
            }
        }
        tracing::warn!(cycle = self.state.cycle, %error, ?response, "control cycle failed");
        self.send_command(actuators);
        Some(response)
    }
}
