//! Benchmark Planner
//!
//! Builds the execution plan by filtering, validating and ordering the
//! configured benchmarks.
//!
//! Filtering: regex pattern matching on the benchmark name.
//!
//! Ordering: benchmarks are sorted alphabetically by name for deterministic execution.
//! Every command of a benchmark is built before anything runs; a benchmark whose
//! options fail validation is rejected with its error instead of being planned.

use crate::config::{BenchmarkSpec, SweepConfig};
use std::path::Path;
use sweepbench_core::{
    BenchmarkBinary, CUBLASLT_IN_TYPES, Command, ConfigError, OutputParser,
};
use tracing::debug;

/// A validated benchmark with its ordered command list
#[derive(Debug, Clone)]
pub struct PlannedBenchmark {
    /// Benchmark name
    pub name: String,
    /// Commands in enumeration order
    pub commands: Vec<Command>,
    /// Output format of the executable
    pub parser: OutputParser,
}

/// A benchmark whose configuration was rejected
#[derive(Debug, Clone)]
pub struct RejectedBenchmark {
    /// Benchmark name
    pub name: String,
    /// Validation error
    pub error: ConfigError,
}

/// Execution plan for benchmarks
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Ordered list of benchmarks to run
    pub benchmarks: Vec<PlannedBenchmark>,
    /// Benchmarks that failed validation, in name order
    pub rejected: Vec<RejectedBenchmark>,
}

impl ExecutionPlan {
    /// Total number of commands across planned benchmarks
    pub fn command_count(&self) -> usize {
        self.benchmarks.iter().map(|b| b.commands.len()).sum()
    }
}

/// Build execution plan from configured benchmarks
///
/// Filters benchmarks by name and returns them in deterministic order.
pub fn build_plan(
    config: &SweepConfig,
    filter: Option<&regex::Regex>,
    bin_dir: &Path,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::default();

    // BTreeMap iteration is already sorted by name
    for (name, spec) in &config.benchmarks {
        if let Some(re) = filter {
            if !re.is_match(name) {
                continue;
            }
        }

        match plan_benchmark(name, spec, bin_dir) {
            Ok(planned) => {
                for command in &planned.commands {
                    debug!(benchmark = %name, "{}", command);
                }
                plan.benchmarks.push(planned);
            }
            Err(error) => plan.rejected.push(RejectedBenchmark {
                name: name.clone(),
                error,
            }),
        }
    }

    plan
}

/// Validate one benchmark and build all of its commands.
pub fn plan_benchmark(
    name: &str,
    spec: &BenchmarkSpec,
    bin_dir: &Path,
) -> Result<PlannedBenchmark, ConfigError> {
    let binary = BenchmarkBinary::new(name, spec.binary(), bin_dir)?;
    let (commands, parser) = match spec {
        BenchmarkSpec::Gemm { options, .. } => (
            options.validate(binary, CUBLASLT_IN_TYPES)?.commands(),
            OutputParser::GemmLine,
        ),
        BenchmarkSpec::Nvbench { options, .. } => (
            options.validate(binary)?.commands(),
            OutputParser::NvbenchTable,
        ),
    };

    Ok(PlannedBenchmark {
        name: name.to_string(),
        commands,
        parser,
    })
}
