use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::Level;

mod config;
mod environment;
mod results;
mod sim;

use config::SimConfig;
use sim::Simulation;

/// Closed-loop simulation of the magnetic LQR attitude controller.
#[derive(Parser, Debug)]
#[command(name = "mag_lqr_sim")]
struct Cli {
    #[arg(long, short, help = "RON simulation config, MiTEE-2 defaults when omitted")]
    config: Option<PathBuf>,
    #[arg(long, short = 'n', help = "Number of control cycles, overrides the config")]
    cycles: Option<usize>,
    #[arg(long, short, default_value = "results", help = "Directory for csv results")]
    output: PathBuf,
    #[arg(long, default_value_t = 0, help = "Magnetometer noise seed")]
    seed: u64,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = match &cli.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };
    if let Some(cycles) = cli.cycles {
        config.cycles = cycles;
    }

    let mut sim = match Simulation::new(&config, cli.seed) {
        Ok(sim) => sim,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let summary = match sim.run(Some(&cli.output)) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        cycles = summary.cycles,
        commands = sim.torquers().commands,
        faults = summary.faults(),
        held = summary.held,
        retained = summary.retained,
        idled = summary.idled,
        "simulation complete"
    );
    if !sim.controller().state.gain_valid {
        tracing::warn!("no control cycle produced a valid gain");
    }
    tracing::info!(
        start = summary.initial_state.norm(),
        end = summary.final_state.norm(),
        "attitude deviation norm"
    );
    tracing::info!("results written to {}", cli.output.display());
    ExitCode::SUCCESS
}
