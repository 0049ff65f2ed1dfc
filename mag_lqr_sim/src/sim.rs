use std::path::Path;

use magnetic_lqr::{Controller, FaultResponse, LqrErrors};
use nalgebra::{Matrix6x3, Vector6};
use thiserror::Error;

use crate::{
    config::SimConfig,
    environment::{EnvironmentErrors, Spacecraft, Torquers},
    results::{ResultErrors, ResultManager},
};

#[derive(Debug, Error)]
pub enum SimErrors {
    #[error("{0}")]
    Controller(#[from] LqrErrors),
    #[error("{0}")]
    Environment(#[from] EnvironmentErrors),
    #[error("{0}")]
    Results(#[from] ResultErrors),
}

const SPACECRAFT_HEADERS: [&str; 11] = [
    "time", "roll", "pitch", "yaw", "roll_rate", "pitch_rate", "yaw_rate", "b[x]", "b[y]", "b[z]",
    "dipole_norm",
];

const CONTROLLER_HEADERS: [&str; 10] = [
    "cycle", "time", "b[x]", "b[y]", "b[z]", "u[x]", "u[y]", "u[z]", "newton_iterations", "status",
];

#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub cycles: usize,
    pub held: usize,
    pub retained: usize,
    pub idled: usize,
    pub initial_state: Vector6<f64>,
    pub final_state: Vector6<f64>,
}

impl Summary {
    pub fn faults(&self) -> usize {
        self.held + self.retained + self.idled
    }
}

/// Closed loop of the controller against the truth model, one control
/// sample per cycle.
pub struct Simulation {
    controller: Controller,
    spacecraft: Spacecraft,
    torquers: Torquers,
    cycles: usize,
}

impl Simulation {
    pub fn new(config: &SimConfig, seed: u64) -> Result<Self, SimErrors> {
        Ok(Self {
            controller: Controller::new(config.controller.clone())?,
            spacecraft: Spacecraft::new(config, seed)?,
            torquers: Torquers::default(),
            cycles: config.cycles,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn torquers(&self) -> &Torquers {
        &self.torquers
    }

    /// Runs all cycles, writing `spacecraft.csv` and `controller.csv` under
    /// `output` when given.
    pub fn run(&mut self, output: Option<&Path>) -> Result<Summary, SimErrors> {
        let mut results = match output {
            Some(path) => {
                let mut manager = ResultManager::new(path)?;
                let spacecraft = manager.new_writer("spacecraft", &SPACECRAFT_HEADERS)?;
                let controller = manager.new_writer("controller", &CONTROLLER_HEADERS)?;
                Some((manager, spacecraft, controller))
            }
            None => None,
        };

        let mut summary = Summary {
            initial_state: *self.spacecraft.state(),
            ..Default::default()
        };
        let dt = self.controller.model().sample_period();

        for cycle in 0..self.cycles {
            let t = cycle as f64 * dt;
            self.spacecraft.sense(t)?;

            // iterations are only reported for cycles that ran the newton solve to an end
            let outcome = self.controller.step(&self.spacecraft, &mut self.torquers);
            let (status, iterations) = match outcome {
                Ok(_) => ("ok".to_string(), Some(self.controller.state.newton_iterations)),
                Err(e) => {
                    let Some(response) = self.controller.recover(&e, &mut self.torquers) else {
                        // configuration errors cannot occur after construction
                        return Err(e.into());
                    };
                    match response {
                        FaultResponse::HoldCommand => summary.held += 1,
                        FaultResponse::RetainGain => summary.retained += 1,
                        FaultResponse::Idle => summary.idled += 1,
                    }
                    let iterations = match e {
                        LqrErrors::Convergence { iterations, .. } => Some(iterations),
                        _ => None,
                    };
                    (format!("{response:?}"), iterations)
                }
            };

            if let Some((manager, spacecraft_id, controller_id)) = results.as_mut() {
                let x = self.spacecraft.state();
                let b = self.spacecraft.true_field();
                let mut record: Vec<String> = vec![t.to_string()];
                record.extend(x.iter().chain(b.iter()).map(|v| v.to_string()));
                record.push(self.torquers.dipole.norm().to_string());
                manager.write_record(*spacecraft_id, &record)?;

                let state = &self.controller.state;
                let mut record = vec![state.cycle.to_string(), t.to_string()];
                record.extend(state.b.iter().chain(state.u.iter()).map(|v| v.to_string()));
                record.push(iterations.map(|n| n.to_string()).unwrap_or_default());
                record.push(status);
                manager.write_record(*controller_id, &record)?;
            }

            // the plant sees the true field, which may differ from the measured one
            let b_d = self
                .controller
                .input_matrices()
                .build(self.spacecraft.true_field())
                .map(|inputs| inputs.discrete)
                .unwrap_or_else(|_| Matrix6x3::zeros());
            let a_d = *self.controller.model().a_d();
            self.spacecraft.propagate(&a_d, &b_d, &self.torquers.dipole);
            summary.cycles += 1;
        }

        if let Some((manager, _, _)) = results.as_mut() {
            manager.flush()?;
        }
        summary.final_state = *self.spacecraft.state();
        Ok(summary)
    }
}
