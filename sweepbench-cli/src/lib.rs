#![warn(missing_docs)]
//! SweepBench CLI Library
//!
//! This module provides the command-line front end: `sweep.toml` discovery,
//! planning, supervised execution of the benchmark executables and output.
//! Use `sweepbench::run()` (or `sweepbench_cli::run()`) in your main function.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     sweepbench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::*;
pub use executor::{ExecutionConfig, Executor, format_human_output, format_json_output};
pub use planner::{ExecutionPlan, PlannedBenchmark, RejectedBenchmark, build_plan, plan_benchmark};
pub use supervisor::*;

use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use sweepbench_core::{IbDeviceSelection, ReturnCode, parse_ib_devices};
use tracing::info;

/// Environment variable selecting InfiniBand devices
pub const IB_DEVICES_ENV: &str = "IB_DEVICES";

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Terminal-friendly summary
    Human,
    /// Pretty-printed JSON array of results
    Json,
}

/// SweepBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sweepbench")]
#[command(author, version, about = "SweepBench - GPU micro-benchmark sweep runner")]
pub struct Cli {
    /// Optional subcommand (List, Run, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter benchmarks by regex pattern
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Configuration file (discovered from the current directory if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the benchmark executables
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,

    /// Number of commands executed in parallel
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Number of rounds each benchmark is repeated
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Timeout for a single command (e.g., "60s", "500ms")
    #[arg(long)]
    pub timeout: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dry run - list planned commands without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured benchmarks and the commands they expand to
    List,
    /// Run benchmarks (default)
    Run,
    /// Write a default sweep.toml to the current directory
    Init,
}

/// Run the SweepBench CLI with the process arguments.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the SweepBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging on stderr so stdout stays parseable
    let filter = if cli.verbose {
        "sweepbench=debug"
    } else {
        "sweepbench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Init) = cli.command {
        return init_config(Path::new(config::CONFIG_FILE_NAME));
    }

    // Environment device selection is validated before any command is built
    if let Some(selection) = ib_devices_from_env()? {
        info!(?selection, "Using {} from environment", IB_DEVICES_ENV);
    }

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::List) => list_benchmarks(&cli, &config),
        Some(Commands::Run) => run_benchmarks(&cli, &config),
        Some(Commands::Init) => Ok(()),
        None => {
            // Default: run benchmarks
            if cli.dry_run {
                list_benchmarks(&cli, &config)
            } else {
                run_benchmarks(&cli, &config)
            }
        }
    }
}

/// Read and validate `IB_DEVICES`; unset means no explicit selection.
pub fn ib_devices_from_env() -> anyhow::Result<Option<IbDeviceSelection>> {
    match std::env::var(IB_DEVICES_ENV) {
        Ok(value) => Ok(Some(parse_ib_devices(&value)?)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow::anyhow!("Invalid {}: {}", IB_DEVICES_ENV, e)),
    }
}

/// Load the configuration: explicit `--config`, else discovered `sweep.toml`,
/// else defaults. CLI flags override file values.
pub fn load_config(cli: &Cli) -> anyhow::Result<SweepConfig> {
    let mut config = match &cli.config {
        Some(path) => SweepConfig::load(path)?,
        None => SweepConfig::discover().transpose()?.unwrap_or_default(),
    };

    if let Some(bin_dir) = &cli.bin_dir {
        config.runner.bin_dir = bin_dir.clone();
    }
    if let Some(jobs) = cli.jobs {
        config.runner.jobs = Some(jobs);
    }
    if let Some(rounds) = cli.rounds {
        config.runner.rounds = rounds;
    }
    if let Some(timeout) = &cli.timeout {
        config.runner.timeout = timeout.clone();
    }
    Ok(config)
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", path.display()));
    }
    std::fs::write(path, SweepConfig::default_toml())?;
    println!("Configuration written to: {}", path.display());
    Ok(())
}

fn filter_regex(cli: &Cli) -> anyhow::Result<Regex> {
    Regex::new(&cli.filter).map_err(|e| anyhow::anyhow!("Invalid filter '{}': {}", cli.filter, e))
}

fn list_benchmarks(cli: &Cli, config: &SweepConfig) -> anyhow::Result<()> {
    println!("SweepBench Plan:");

    let filter_re = filter_regex(cli)?;
    let plan = build_plan(config, Some(&filter_re), &config.runner.bin_dir);

    for bench in &plan.benchmarks {
        let kind = config
            .benchmarks
            .get(&bench.name)
            .map(BenchmarkSpec::kind)
            .unwrap_or_default();
        println!("├── {} ({}, {} commands)", bench.name, kind, bench.commands.len());
        for command in &bench.commands {
            println!("│   ├── {}", command);
        }
    }
    for rejected in &plan.rejected {
        println!(
            "├── {} [{:?}] {}",
            rejected.name,
            rejected.error.code(),
            rejected.error
        );
    }

    println!(
        "{} benchmarks, {} commands, {} rejected.",
        plan.benchmarks.len(),
        plan.command_count(),
        plan.rejected.len()
    );
    Ok(())
}

fn run_benchmarks(cli: &Cli, config: &SweepConfig) -> anyhow::Result<()> {
    let filter_re = filter_regex(cli)?;
    let plan = build_plan(config, Some(&filter_re), &config.runner.bin_dir);

    if plan.benchmarks.is_empty() && plan.rejected.is_empty() {
        println!("No benchmarks found.");
        return Ok(());
    }

    let jobs = config.runner.jobs.unwrap_or(1).max(1);
    let timeout = config.runner.timeout()?;
    eprintln!(
        "Running {} benchmarks ({} commands), {} worker(s)...\n",
        plan.benchmarks.len(),
        plan.command_count(),
        jobs
    );

    let exec_config = ExecutionConfig {
        rounds: config.runner.rounds,
        log_raw_data: config.runner.log_raw_data,
        progress: true,
    };
    let runner = ProcessRunner;
    let executor = Executor::new(exec_config, Supervisor::new(timeout, jobs), &runner);
    let results = executor.execute(&plan)?;

    // Generate output
    let output = match cli.format {
        OutputFormat::Json => format_json_output(&results)?,
        OutputFormat::Human => format_human_output(&results),
    };

    // Write output
    if let Some(ref path) = cli.output {
        let mut file = std::fs::File::create(path)?;
        file.write_all(output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    // Exit with appropriate code
    let failed: Vec<_> = results
        .iter()
        .filter(|r| r.return_code != ReturnCode::Success)
        .collect();
    if !failed.is_empty() {
        eprintln!("\n{} benchmark(s) did not succeed", failed.len());
        std::process::exit(1);
    }

    Ok(())
}
