#![warn(missing_docs)]
//! SweepBench Core - Command and Result Pipeline
//!
//! This crate holds the pure pipeline around external GPU micro-benchmark
//! executables:
//! - Unit parsing for raw measurement tokens
//! - Parameter validation (`NvbenchOptions`, `GemmOptions`)
//! - Shape sweep enumeration
//! - Deterministic command construction
//! - Result parsing and failure classification
//!
//! Nothing here spawns processes; the CLI crate owns execution.

mod binary;
mod command;
mod devices;
mod error;
mod gemm;
mod outcome;
mod params;
mod sweep;
mod units;

pub use binary::BenchmarkBinary;
pub use command::{Command, build_gemm_command, build_nvbench_command, format_float};
pub use devices::{DeviceSelector, IbDeviceSelection, parse_ib_devices};
pub use error::ConfigError;
pub use gemm::{
    Autotune, CUBLASLT_IN_TYPES, GemmDims, GemmOptions, GemmParams, GemmRun, parse_shape,
};
pub use outcome::{
    BenchmarkResult, GEMM_FIELD_COUNT, NO_OUTPUT_COLLECTED, OutputParser, ParsedMetric,
    ResultParseError, ReturnCode, RunFailure, RunOutcome, collect_outcomes, parse_gemm_output,
    parse_nvbench_table,
};
pub use params::{
    DEFAULT_MAX_ANGLE, DEFAULT_MAX_NOISE, DEFAULT_MIN_R2, DEFAULT_MIN_SAMPLES, DEFAULT_MIN_TIME,
    DEFAULT_TIMEOUT_SECS, NvbenchOptions, NvbenchParams, StoppingCriterion,
    StoppingCriterionKind,
};
pub use sweep::{
    MAX_RANGE_LEN, MAX_SWEEP_LEN, ShapeAxis, Sweep, SweepIter, cross_product, parse_range,
};
pub use units::{
    MetricUnit, TIME_SUFFIXES, UnitParseError, UnitValue, parse_percentage, parse_time_to_us,
    parse_unit_value,
};
