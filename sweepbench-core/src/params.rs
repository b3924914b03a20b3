//! NVBench Parameter Validation
//!
//! [`NvbenchOptions`] is the raw, user-facing option set (every field optional,
//! deserializable from `sweep.toml`). [`NvbenchOptions::validate`] turns it into
//! [`NvbenchParams`], where the stopping criterion is a single enum variant
//! carrying only its own sub-options: the `stdrel` and `entropy` groups cannot
//! both be present.

use crate::binary::BenchmarkBinary;
use crate::command::{Command, build_nvbench_command};
use crate::devices::DeviceSelector;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default executable timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 15;
/// Default minimum number of samples
pub const DEFAULT_MIN_SAMPLES: u32 = 10;
/// Default `stdrel` minimum measurement time in seconds
pub const DEFAULT_MIN_TIME: f64 = 0.5;
/// Default `stdrel` maximum relative noise
pub const DEFAULT_MAX_NOISE: f64 = 0.5;
/// Default `entropy` maximum angle
pub const DEFAULT_MAX_ANGLE: f64 = 0.048;
/// Default `entropy` minimum R²
pub const DEFAULT_MIN_R2: f64 = 0.36;

/// Stopping criterion tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoppingCriterionKind {
    /// Relative standard deviation
    #[default]
    Stdrel,
    /// Entropy-based convergence
    Entropy,
}

impl FromStr for StoppingCriterionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stdrel" => Ok(StoppingCriterionKind::Stdrel),
            "entropy" => Ok(StoppingCriterionKind::Entropy),
            other => Err(ConfigError::UnknownStoppingCriterion(other.to_string())),
        }
    }
}

impl fmt::Display for StoppingCriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoppingCriterionKind::Stdrel => write!(f, "stdrel"),
            StoppingCriterionKind::Entropy => write!(f, "entropy"),
        }
    }
}

/// Resolved stopping criterion with its sub-options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoppingCriterion {
    /// Stop once the relative standard deviation drops below `max_noise`
    Stdrel {
        /// Minimum accumulated GPU time in seconds
        min_time: f64,
        /// Maximum relative noise
        max_noise: f64,
    },
    /// Stop once the entropy curve flattens
    Entropy {
        /// Maximum slope angle
        max_angle: f64,
        /// Minimum coefficient of determination
        min_r2: f64,
    },
}

impl StoppingCriterion {
    /// The tag selecting this criterion
    pub fn kind(&self) -> StoppingCriterionKind {
        match self {
            StoppingCriterion::Stdrel { .. } => StoppingCriterionKind::Stdrel,
            StoppingCriterion::Entropy { .. } => StoppingCriterionKind::Entropy,
        }
    }
}

impl Default for StoppingCriterion {
    fn default() -> Self {
        StoppingCriterion::Stdrel {
            min_time: DEFAULT_MIN_TIME,
            max_noise: DEFAULT_MAX_NOISE,
        }
    }
}

/// Raw NVBench options as supplied by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NvbenchOptions {
    /// Device selector: an index, a comma-separated list or `all`
    #[serde(default)]
    pub devices: Option<String>,
    /// Skip samples faster than this many seconds
    #[serde(default)]
    pub skip_time: Option<f64>,
    /// GPU clock throttle threshold in percent
    #[serde(default)]
    pub throttle_threshold: Option<f64>,
    /// Delay after a throttle event in seconds
    #[serde(default)]
    pub throttle_recovery_delay: Option<f64>,
    /// Run each benchmark exactly once
    #[serde(default)]
    pub run_once: bool,
    /// Disable the blocking kernel used to hide launch overhead
    #[serde(default)]
    pub disable_blocking_kernel: bool,
    /// Enable profiler-friendly mode
    #[serde(default)]
    pub profile: bool,
    /// Per-measurement timeout in seconds
    #[serde(default)]
    pub timeout: Option<u32>,
    /// Minimum number of samples
    #[serde(default)]
    pub min_samples: Option<u32>,
    /// `stdrel` (default) or `entropy`
    #[serde(default)]
    pub stopping_criterion: Option<String>,
    /// `stdrel` minimum time
    #[serde(default)]
    pub min_time: Option<f64>,
    /// `stdrel` maximum noise
    #[serde(default)]
    pub max_noise: Option<f64>,
    /// `entropy` maximum angle
    #[serde(default)]
    pub max_angle: Option<f64>,
    /// `entropy` minimum R²
    #[serde(default)]
    pub min_r2: Option<f64>,
}

/// Validated NVBench parameters
#[derive(Debug, Clone, PartialEq)]
pub struct NvbenchParams {
    /// Executable identity
    pub binary: BenchmarkBinary,
    /// Device selection, omitted from the command when `None`
    pub devices: Option<DeviceSelector>,
    /// Optional skip-time override
    pub skip_time: Option<f64>,
    /// Optional throttle-threshold override
    pub throttle_threshold: Option<f64>,
    /// Optional throttle-recovery-delay override
    pub throttle_recovery_delay: Option<f64>,
    /// `--run-once`
    pub run_once: bool,
    /// `--disable-blocking-kernel`
    pub disable_blocking_kernel: bool,
    /// `--profile`
    pub profile: bool,
    /// Timeout in seconds
    pub timeout: u32,
    /// Minimum samples
    pub min_samples: u32,
    /// Active stopping criterion
    pub stopping_criterion: StoppingCriterion,
}

impl NvbenchParams {
    /// Default parameters for `binary`
    pub fn new(binary: BenchmarkBinary) -> Self {
        Self {
            binary,
            devices: None,
            skip_time: None,
            throttle_threshold: None,
            throttle_recovery_delay: None,
            run_once: false,
            disable_blocking_kernel: false,
            profile: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            min_samples: DEFAULT_MIN_SAMPLES,
            stopping_criterion: StoppingCriterion::default(),
        }
    }

    /// The command list for this benchmark: NVBench sweeps its own axes, so a
    /// single invocation covers the whole parameter space.
    pub fn commands(&self) -> Vec<Command> {
        vec![build_nvbench_command(self)]
    }
}

impl NvbenchOptions {
    /// Validate the options and resolve defaults.
    ///
    /// Sub-options belonging to the inactive stopping criterion are dropped
    /// (with a warning); which group is emitted depends only on the mode tag.
    pub fn validate(&self, binary: BenchmarkBinary) -> Result<NvbenchParams, ConfigError> {
        let kind = match &self.stopping_criterion {
            Some(tag) => tag.parse::<StoppingCriterionKind>()?,
            None => StoppingCriterionKind::default(),
        };

        let stopping_criterion = match kind {
            StoppingCriterionKind::Stdrel => {
                warn_inactive(kind, &[("max_angle", self.max_angle), ("min_r2", self.min_r2)]);
                StoppingCriterion::Stdrel {
                    min_time: finite("min_time", self.min_time.unwrap_or(DEFAULT_MIN_TIME))?,
                    max_noise: finite("max_noise", self.max_noise.unwrap_or(DEFAULT_MAX_NOISE))?,
                }
            }
            StoppingCriterionKind::Entropy => {
                warn_inactive(kind, &[("min_time", self.min_time), ("max_noise", self.max_noise)]);
                StoppingCriterion::Entropy {
                    max_angle: finite("max_angle", self.max_angle.unwrap_or(DEFAULT_MAX_ANGLE))?,
                    min_r2: finite("min_r2", self.min_r2.unwrap_or(DEFAULT_MIN_R2))?,
                }
            }
        };

        let devices = self
            .devices
            .as_deref()
            .map(DeviceSelector::parse)
            .transpose()?;

        Ok(NvbenchParams {
            binary,
            devices,
            skip_time: self.skip_time.map(|v| finite("skip_time", v)).transpose()?,
            throttle_threshold: self
                .throttle_threshold
                .map(|v| finite("throttle_threshold", v))
                .transpose()?,
            throttle_recovery_delay: self
                .throttle_recovery_delay
                .map(|v| finite("throttle_recovery_delay", v))
                .transpose()?,
            run_once: self.run_once,
            disable_blocking_kernel: self.disable_blocking_kernel,
            profile: self.profile,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            min_samples: self.min_samples.unwrap_or(DEFAULT_MIN_SAMPLES),
            stopping_criterion,
        })
    }
}

fn warn_inactive(active: StoppingCriterionKind, options: &[(&str, Option<f64>)]) {
    for (name, value) in options {
        if value.is_some() {
            warn!(
                option = *name,
                stopping_criterion = %active,
                "Ignoring option of inactive stopping criterion"
            );
        }
    }
}

fn finite(option: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            option: option.to_string(),
            reason: format!("{} is not a finite number", value),
        })
    }
}
