//! Configuration loading from sweep.toml
//!
//! SweepBench configuration lives in a `sweep.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.
//!
//! ```toml
//! [runner]
//! bin_dir = "/opt/superbench/bin"
//! timeout = "60s"
//!
//! [benchmarks.cublaslt-gemm]
//! kind = "gemm"
//! shapes = ["2:8:*2,64,64"]
//! in_types = ["fp16", "fp32"]
//!
//! [benchmarks.nvbench-sleep-kernel]
//! kind = "nvbench"
//! binary = "nvbench_sleep_kernel"
//! stopping_criterion = "entropy"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sweepbench_core::{GemmOptions, NvbenchOptions, parse_time_to_us};

/// Name of the configuration file looked up by [`SweepConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "sweep.toml";

/// SweepBench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SweepConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Benchmark definitions keyed by benchmark name
    #[serde(default)]
    pub benchmarks: BTreeMap<String, BenchmarkSpec>,
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Directory holding the benchmark executables
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    /// Timeout for a single command (e.g., "60s", "500ms")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Number of commands executed in parallel
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Number of rounds each benchmark is repeated
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    /// Echo raw executable output to the log
    #[serde(default)]
    pub log_raw_data: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            timeout: default_timeout(),
            jobs: None,
            rounds: default_rounds(),
            log_raw_data: false,
        }
    }
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}
fn default_timeout() -> String {
    "60s".to_string()
}
fn default_rounds() -> usize {
    1
}

impl RunnerConfig {
    /// Parsed per-command timeout
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        parse_timeout(&self.timeout)
    }
}

/// One configured benchmark, tagged by the executable family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BenchmarkSpec {
    /// GEMM sweep over shapes, batches and data types
    Gemm {
        /// Executable name inside `bin_dir`
        #[serde(default = "default_gemm_binary")]
        binary: String,
        /// Sweep options
        #[serde(flatten)]
        options: GemmOptions,
    },
    /// NVBench executable
    Nvbench {
        /// Executable name inside `bin_dir`
        #[serde(default)]
        binary: String,
        /// Measurement options
        #[serde(flatten)]
        options: NvbenchOptions,
    },
}

fn default_gemm_binary() -> String {
    "cublaslt_gemm".to_string()
}

impl BenchmarkSpec {
    /// Short tag used in listings
    pub fn kind(&self) -> &'static str {
        match self {
            BenchmarkSpec::Gemm { .. } => "gemm",
            BenchmarkSpec::Nvbench { .. } => "nvbench",
        }
    }

    /// Configured executable name (may be empty)
    pub fn binary(&self) -> &str {
        match self {
            BenchmarkSpec::Gemm { binary, .. } | BenchmarkSpec::Nvbench { binary, .. } => binary,
        }
    }
}

impl SweepConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<anyhow::Result<Self>> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(Self::load(&config_path));
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# SweepBench Configuration

[runner]
# Directory holding the benchmark executables
bin_dir = "bin"
# Timeout for a single command
timeout = "60s"
# Number of rounds each benchmark is repeated
rounds = 1
# Echo raw executable output to the log
log_raw_data = false
# Number of commands executed in parallel (uncomment to enable)
# jobs = 4

[benchmarks.cublaslt-gemm]
kind = "gemm"
binary = "cublaslt_gemm"
# Shapes as "m,n,k"; each dimension may be a range "start:end[:step]"
shapes = ["2048,2048,2048", "4096,4096,4096", "8192,8192,8192"]
# Batch size or range, 0 disables strided batch
batch = "0"
# fp64, fp32, fp16, bf16, fp8e4m3, fp8e5m2, fp4e2m1, int8
in_types = ["fp8e4m3"]
num_warmup = 20
num_steps = 50
enable_autotune = false

[benchmarks.nvbench-sleep-kernel]
kind = "nvbench"
binary = "nvbench_sleep_kernel"
# Device selector: an index, "0,1" or "all" (uncomment to enable)
# devices = "all"
timeout = 15
min_samples = 10
# "stdrel" (min_time, max_noise) or "entropy" (max_angle, min_r2)
stopping_criterion = "stdrel"
min_time = 0.5
max_noise = 0.5
"#
        .to_string()
    }
}

/// Parse a timeout string (e.g., "60s", "500ms", "2m") into a duration.
/// A bare number is taken as seconds.
pub fn parse_timeout(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let micros = if let Ok(secs) = s.parse::<f64>() {
        secs * 1_000_000.0
    } else if let Some(minutes) = s.strip_suffix('m') {
        parse_time_to_us(&format!("{}s", minutes.trim()))? * 60.0
    } else {
        parse_time_to_us(s)?
    };
    if micros.is_nan() || micros <= 0.0 {
        return Err(anyhow::anyhow!("Timeout must be positive: {}", s));
    }
    Duration::try_from_secs_f64(micros / 1_000_000.0)
        .map_err(|e| anyhow::anyhow!("Invalid timeout {}: {}", s, e))
}
