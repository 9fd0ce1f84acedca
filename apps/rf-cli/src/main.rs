use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use rf_core::{pa_to_bar, seconds_to_days};
use rf_model::{Case, ReservoirState};
use rf_results::{
    RestartOrigin, RestartReader, RunManifest, RunStatus, RunStore, SnapshotWriter,
    compute_run_id,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;

use error::CliResult;

const SOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "rf-cli")]
#[command(about = "ResFlow CLI - report-step reservoir simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file
    Validate {
        /// Path to the case YAML file
        case_path: PathBuf,
    },
    /// Run a case
    Run {
        /// Path to the case YAML file
        case_path: PathBuf,
        /// Directory holding run directories (defaults to .resflow/runs next to the case)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Resume from a stored run directory
        #[arg(long)]
        restart: Option<PathBuf>,
        /// Report step to resume from (defaults to the last one written)
        #[arg(long, requires = "restart")]
        restart_step: Option<usize>,
        /// Suppress progress logging
        #[arg(long)]
        quiet: bool,
    },
    /// Show a stored run
    ShowRun {
        /// Run directory
        run_dir: PathBuf,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            out,
            restart,
            restart_step,
            quiet,
        } => cmd_run(
            &case_path,
            out.as_deref(),
            restart.as_deref(),
            restart_step,
            quiet,
        ),
        Commands::ShowRun { run_dir } => cmd_show_run(&run_dir),
    }
}

fn cmd_validate(case_path: &Path) -> CliResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = Case::load_yaml(case_path)?;
    let schedule = case.schedule();

    println!("✓ Case '{}' is valid", case.name());
    println!("  Cells: {}", case.grid().num_cells());
    println!("  Wells: {}", case.wells().len());
    println!(
        "  Aquifer: {}",
        if case.aquifer().is_active() {
            "yes"
        } else {
            "no"
        }
    );
    println!(
        "  Report steps: {} ({:.1} days from {})",
        schedule.num_steps(),
        seconds_to_days(schedule.total_time()),
        schedule.start_date()
    );
    for step in 0..schedule.num_steps() {
        let events = schedule.events_at(step);
        if !events.is_empty() {
            let names: Vec<String> = events.iter().map(|e| e.to_string()).collect();
            println!("    step {:>3}: {}", step, names.join(", "));
        }
    }
    Ok(())
}

fn default_runs_dir(case_path: &Path) -> PathBuf {
    case_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".resflow")
        .join("runs")
}

fn cmd_run(
    case_path: &Path,
    out: Option<&Path>,
    restart: Option<&Path>,
    restart_step: Option<usize>,
    quiet: bool,
) -> CliResult<()> {
    let case = Case::load_yaml(case_path)?;
    let store = RunStore::new(
        out.map(Path::to_path_buf)
            .unwrap_or_else(|| default_runs_dir(case_path)),
    )?;

    let reader = restart.map(|dir| RestartReader::new(dir, restart_step));
    let origin: Option<RestartOrigin> = reader.as_ref().map(|r| r.origin()).transpose()?;

    let run_id = compute_run_id(case.def(), SOLVER_VERSION, origin.as_ref());
    let mut manifest = RunManifest {
        run_id: run_id.clone(),
        case_name: case.name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: SOLVER_VERSION.to_string(),
        num_report_steps: case.schedule().num_steps(),
        restarted_from: origin,
        status: RunStatus::Running,
        report: None,
        failures: None,
    };
    let run_dir = store.create_run(&manifest)?;
    info!(run_id = %run_id, "Writing results to {}", run_dir.display());

    let writer = SnapshotWriter::open(&run_dir)?;
    let (mut driver, schedule, initial) = case.into_driver(!quiet, Box::new(writer))?;
    if let Some(reader) = reader {
        driver = driver.with_restart(Box::new(reader));
    }

    match driver.run(&schedule, initial) {
        Ok(outcome) => {
            manifest.status = RunStatus::Completed;
            manifest.report = Some(outcome.report);
            manifest.failures = Some(outcome.failures);
            store.save_manifest(&manifest)?;

            println!("✓ Simulation completed: {}", run_id);
            println!("\nAccepted steps:");
            for line in outcome.report.summary_lines() {
                println!("  {}", line);
            }
            if outcome.failures.sub_steps > 0 {
                println!("\nRejected steps:");
                for line in outcome.failures.summary_lines() {
                    println!("  {}", line);
                }
            }
            println!(
                "\nFinal average pressure: {:.2} bar",
                pa_to_bar(outcome.state.average_pressure())
            );
            Ok(())
        }
        Err(err) => {
            manifest.status = RunStatus::Failed {
                message: err.to_string(),
            };
            store.save_manifest(&manifest)?;
            Err(err.into())
        }
    }
}

fn cmd_show_run(run_dir: &Path) -> CliResult<()> {
    let (store, run_id) = RunStore::for_run_dir(run_dir)?;
    let manifest = store.load_manifest(&run_id)?;
    let records = store.load_snapshots::<ReservoirState>(&run_id)?;

    println!("Run: {}", manifest.run_id);
    println!("  Case: {}", manifest.case_name);
    println!("  Started: {}", manifest.timestamp);
    println!("  Solver version: {}", manifest.solver_version);
    match &manifest.status {
        RunStatus::Running => println!("  Status: running (or interrupted)"),
        RunStatus::Completed => println!("  Status: completed"),
        RunStatus::Failed { message } => println!("  Status: failed: {}", message),
    }
    if let Some(origin) = &manifest.restarted_from {
        println!(
            "  Restarted from: {} at report step {}",
            origin.run_id, origin.report_step
        );
    }
    if let Some(report) = &manifest.report {
        println!("\nRun Summary:");
        for line in report.summary_lines() {
            println!("  {}", line);
        }
    }

    println!(
        "\n{:>6} {:>10} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "step", "day", "avg [bar]", "min [bar]", "max [bar]", "aquifer", "next [d]"
    );
    for record in &records {
        let state = &record.state;
        let aquifer = state
            .aquifer_pressure
            .map(|p| format!("{:.2}", pa_to_bar(p)))
            .unwrap_or_else(|| "-".to_string());
        let next = record
            .next_step_s
            .map(|s| format!("{:.3}", seconds_to_days(s)))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6} {:>10.2} {:>12.2} {:>12.2} {:>12.2} {:>12} {:>12}",
            record.report_step,
            record.time_days,
            pa_to_bar(state.average_pressure()),
            pa_to_bar(state.min_pressure()),
            pa_to_bar(state.max_pressure()),
            aquifer,
            next
        );
    }
    Ok(())
}
