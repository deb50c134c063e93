use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bocopreader::configuration::Configuration;
use bocopreader::solution::bocopsolution::BocopSolution;
use bocopreader::solution::variablebunch::VariableBunch;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a BOCOP solution directory", long_about = None)]
struct Cli {
    /// Directory holding the `.export` files
    #[arg(value_hint = ValueHint::DirPath)]
    directory: PathBuf,

    /// JSON configuration file
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Times at which every variable is evaluated
    #[arg(long = "at", num_args = 1..)]
    times: Vec<f64>,

    /// Print the piecewise-constant fit of every variable as LaTeX
    #[arg(long)]
    latex: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let configuration = match &cli.config {
        Some(path) => Configuration::from_reader(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => Configuration::new(),
    };
    let solution = BocopSolution::load_with_configuration(&cli.directory, &configuration)
        .with_context(|| format!("loading solution from {}", cli.directory.display()))?;

    println!("{}", solution);
    println!("{}", solution.states());
    println!("{}", solution.adjoint_states());
    println!("{}", solution.controls());
    for name in solution.states().names() {
        let view = solution.state(name)?;
        match view.adjoint() {
            Some(adjoint) => println!("  {} -> {}", name, adjoint.name()),
            None => println!("  {} -> (no adjoint)", name),
        }
    }
    let (rows, cols) = solution.table().shape();
    info!(rows, cols, "solution table");

    for bunch in [solution.states(), solution.adjoint_states(), solution.controls()] {
        report(bunch, &cli.times, cli.latex);
    }
    Ok(())
}

fn report(bunch: &VariableBunch, times: &[f64], latex: bool) {
    for variable in bunch {
        if latex {
            println!("{}", variable.step_interpolator());
        }
        if times.is_empty() {
            continue;
        }
        let smooth = variable.evaluate(times);
        for (t, value) in times.iter().zip(smooth.iter()) {
            let step = variable
                .step_interpolator()
                .value(*t)
                .map(|v| v.to_string())
                .unwrap_or_else(|err| err.to_string());
            println!("{}({}) = {} (step: {})", variable.name(), t, value, step);
        }
    }
}
