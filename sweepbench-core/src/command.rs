//! Command Construction
//!
//! Pure builders turning one validated configuration into one invocation of
//! the external executable. Flag order is fixed so identical inputs always
//! produce identical commands.
//!
//! GEMM:
//! ```text
//! <bin> -m M -n N -k K -b B -w WARMUP -i STEPS -t DTYPE [-a -W N -I N]
//! ```
//!
//! NVBench:
//! ```text
//! <bin> [--devices SEL] [--skip-time F] [--throttle-threshold F]
//!       [--throttle-recovery-delay F] [--run-once] [--disable-blocking-kernel]
//!       [--profile] --timeout I --min-samples I --stopping-criterion MODE
//!       (--min-time F --max-noise F | --max-angle F --min-r2 F)
//! ```

use crate::gemm::{GemmParams, GemmRun};
use crate::params::{NvbenchParams, StoppingCriterion};
use serde::Serialize;
use std::fmt;

/// One immutable invocation of an external executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    argv: Vec<String>,
}

impl Command {
    /// Command for `program` with the given arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![program.into()];
        argv.extend(args.into_iter().map(Into::into));
        Self { argv }
    }

    /// Executable path (first argv element)
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the executable
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Full argument vector including the executable
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Last whitespace-separated token of the command line
    pub fn tail(&self) -> &str {
        self.argv
            .last()
            .and_then(|last| last.split_whitespace().last())
            .unwrap_or_default()
    }

    /// True if `flag` appears as a standalone argument
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args().iter().any(|a| a == flag)
    }

    /// Value following `flag`, if present
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args()
            .windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Accumulates arguments; `finish` freezes them into a [`Command`].
struct CommandBuilder {
    argv: Vec<String>,
}

impl CommandBuilder {
    fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
        }
    }

    fn flag(&mut self, flag: &str) -> &mut Self {
        self.argv.push(flag.to_string());
        self
    }

    fn opt(&mut self, flag: &str, value: impl fmt::Display) -> &mut Self {
        self.argv.push(flag.to_string());
        self.argv.push(value.to_string());
        self
    }

    fn opt_float(&mut self, flag: &str, value: f64) -> &mut Self {
        self.opt(flag, format_float(value))
    }

    fn flag_if(&mut self, flag: &str, enabled: bool) -> &mut Self {
        if enabled {
            self.flag(flag);
        }
        self
    }

    fn opt_float_if_set(&mut self, flag: &str, value: Option<f64>) -> &mut Self {
        if let Some(v) = value {
            self.opt_float(flag, v);
        }
        self
    }

    fn finish(&mut self) -> Command {
        Command {
            argv: std::mem::take(&mut self.argv),
        }
    }
}

/// Render a float the way the executables' documentation writes them:
/// whole numbers keep a trailing `.0` (`80.0`), fractions print as-is.
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

/// Build the command for one GEMM run.
pub fn build_gemm_command(run: &GemmRun, params: &GemmParams) -> Command {
    let mut cmd = CommandBuilder::new(params.binary.path().display().to_string());
    cmd.opt("-m", run.dims.m)
        .opt("-n", run.dims.n)
        .opt("-k", run.dims.k)
        .opt("-b", run.batch)
        .opt("-w", params.num_warmup)
        .opt("-i", params.num_steps)
        .opt("-t", &run.in_type);

    // Autotune is a single trailing segment
    if let Some(autotune) = params.autotune {
        cmd.flag("-a")
            .opt("-W", autotune.num_warmup)
            .opt("-I", autotune.num_steps);
    }
    cmd.finish()
}

/// Build the command for an NVBench executable.
pub fn build_nvbench_command(params: &NvbenchParams) -> Command {
    let mut cmd = CommandBuilder::new(params.binary.path().display().to_string());

    if let Some(devices) = &params.devices {
        cmd.opt("--devices", devices);
    }
    cmd.opt_float_if_set("--skip-time", params.skip_time)
        .opt_float_if_set("--throttle-threshold", params.throttle_threshold)
        .opt_float_if_set("--throttle-recovery-delay", params.throttle_recovery_delay)
        .flag_if("--run-once", params.run_once)
        .flag_if("--disable-blocking-kernel", params.disable_blocking_kernel)
        .flag_if("--profile", params.profile)
        .opt("--timeout", params.timeout)
        .opt("--min-samples", params.min_samples)
        .opt("--stopping-criterion", params.stopping_criterion.kind());

    match params.stopping_criterion {
        StoppingCriterion::Stdrel {
            min_time,
            max_noise,
        } => {
            cmd.opt_float("--min-time", min_time)
                .opt_float("--max-noise", max_noise);
        }
        StoppingCriterion::Entropy { max_angle, min_r2 } => {
            cmd.opt_float("--max-angle", max_angle)
                .opt_float("--min-r2", min_r2);
        }
    }
    cmd.finish()
}
