/*!
 * MLFQ Simulator - Main Entry Point
 *
 * Runs a workload trace through the multi-core MLFQ scheduler and prints
 * per-process timings and the run score.
 */

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mlfq_kernel::{init_tracing, KernelConfig, Simulation, Trace};

#[derive(Parser, Debug)]
#[command(name = "mlfq-sim", about = "Simulate a multi-core MLFQ scheduler on a workload trace")]
struct Args {
    /// Workload trace (`N` then `pid; arrival; burst_count; burst_time; io_time` lines)
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of simulated cores
    #[arg(long, value_name = "N")]
    cores: Option<usize>,

    /// Wall-clock microseconds per trace time unit
    #[arg(long, value_name = "N")]
    time_unit_us: Option<u64>,

    /// Print the report as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = KernelConfig::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load configuration: {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    if let Some(cores) = args.cores {
        config.simulation.cores = cores;
    }
    if let Some(units) = args.time_unit_us {
        config.simulation.time_unit = Duration::from_micros(units);
    }

    let trace = Trace::from_file(&args.trace)
        .with_context(|| format!("Failed to load trace: {}", args.trace.display()))?;

    info!(
        processes = trace.len(),
        cores = config.simulation.cores,
        levels = config.scheduler.levels,
        "MLFQ simulator starting"
    );

    let report = Simulation::new(config, trace)
        .run()
        .await
        .context("Simulation failed")?;

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
