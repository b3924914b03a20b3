#![warn(missing_docs)]
//! # SweepBench
//!
//! Command and result pipeline for external GPU micro-benchmark executables.
//!
//! SweepBench sits between a benchmark configuration and the executables that
//! do the numeric work:
//! - **Parameter Validation**: mutually exclusive stopping-criterion groups, device selectors, data types
//! - **Shape Sweeps**: cross product of shapes, batch sizes and data types in deterministic order
//! - **Command Construction**: one reproducible command line per run configuration
//! - **Result Parsing**: raw output normalized to metrics; malformed output becomes a classified failure
//! - **Supervised Execution**: parallel child processes with SIGTERM/SIGKILL timeouts
//!
//! ## Quick Start
//!
//! ```
//! use sweepbench::{BenchmarkBinary, NvbenchOptions};
//!
//! let binary = BenchmarkBinary::new("nvbench-sleep-kernel", "nvbench_sleep_kernel", "/opt/bin")?;
//! let params = NvbenchOptions {
//!     stopping_criterion: Some("entropy".to_string()),
//!     ..Default::default()
//! }
//! .validate(binary)?;
//!
//! let command = &params.commands()[0];
//! assert!(command.has_flag("--max-angle"));
//! assert!(!command.has_flag("--min-time"));
//! # Ok::<(), sweepbench::ConfigError>(())
//! ```
//!
//! ## Command Line
//!
//! ```text
//! sweepbench init              # write a default sweep.toml
//! sweepbench list              # show the commands each benchmark expands to
//! sweepbench --format json     # run everything, print results as JSON
//! ```

// Re-export the pipeline
pub use sweepbench_core::{
    Autotune, BenchmarkBinary, BenchmarkResult, CUBLASLT_IN_TYPES, Command, ConfigError,
    DeviceSelector, GemmDims, GemmOptions, GemmParams, GemmRun, IbDeviceSelection, MetricUnit,
    NvbenchOptions, NvbenchParams, OutputParser, ParsedMetric, ResultParseError, ReturnCode,
    RunFailure, RunOutcome, ShapeAxis, StoppingCriterion, StoppingCriterionKind, Sweep,
    UnitParseError, UnitValue, build_gemm_command, build_nvbench_command, collect_outcomes,
    cross_product, parse_gemm_output, parse_ib_devices, parse_nvbench_table, parse_percentage,
    parse_range, parse_shape, parse_time_to_us, parse_unit_value,
};

// Re-export execution
pub use sweepbench_cli::{
    BenchmarkSpec, CommandRunner, ExecutionConfig, ExecutionError, ExecutionPlan, Executor,
    ProcessRunner, RunnerConfig, Supervisor, SupervisorError, SweepConfig, build_plan,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkBinary, BenchmarkResult, Command, CommandRunner, ConfigError, GemmOptions,
        NvbenchOptions, OutputParser, ReturnCode, RunOutcome, SweepConfig,
    };
}

/// Run the SweepBench CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() {
///     sweepbench::run().unwrap();
/// }
/// ```
pub use sweepbench_cli::run;
