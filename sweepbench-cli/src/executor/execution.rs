//! Benchmark Execution
//!
//! Runs every planned command through the [`Supervisor`] and folds the raw
//! outputs into one [`BenchmarkResult`] per benchmark.
//!
//! ## Data Flow
//!
//! ```text
//! ExecutionPlan
//!        │
//!        ▼
//! ┌──────────────────┐
//! │    Supervisor    │  commands → raw stdout | ExecutionError (ordered)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ collect_outcomes │  raw → RunOutcome (parallel, independent)
//! └────────┬─────────┘
//!          │
//!          ▼
//!  BenchmarkResult (raw_data, result, return_code)
//! ```

use crate::planner::{ExecutionPlan, PlannedBenchmark};
use crate::supervisor::{CommandRunner, Supervisor, SupervisorError};
use indicatif::{ProgressBar, ProgressStyle};
use sweepbench_core::{BenchmarkResult, collect_outcomes};
use tracing::{error, info};

/// Configuration for benchmark execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Number of rounds each benchmark is repeated
    pub rounds: usize,
    /// Echo raw executable output to the log
    pub log_raw_data: bool,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            log_raw_data: false,
            progress: true,
        }
    }
}

/// Execute planned benchmarks and produce results
pub struct Executor<'a, R: CommandRunner> {
    config: ExecutionConfig,
    supervisor: Supervisor,
    runner: &'a R,
}

impl<'a, R: CommandRunner> Executor<'a, R> {
    /// Create an executor running commands through `runner`
    pub fn new(config: ExecutionConfig, supervisor: Supervisor, runner: &'a R) -> Self {
        Self {
            config,
            supervisor,
            runner,
        }
    }

    /// Execute all benchmarks in `plan`.
    ///
    /// Rejected benchmarks yield a result carrying their configuration error
    /// code; results are ordered by benchmark name.
    pub fn execute(&self, plan: &ExecutionPlan) -> Result<Vec<BenchmarkResult>, SupervisorError> {
        let pb = if self.config.progress {
            ProgressBar::new(plan.benchmarks.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut results = Vec::with_capacity(plan.benchmarks.len() + plan.rejected.len());

        for rejected in &plan.rejected {
            error!(
                benchmark = %rejected.name,
                code = ?rejected.error.code(),
                "Invalid benchmark configuration: {}",
                rejected.error
            );
            results.push(BenchmarkResult::from_error(
                &rejected.name,
                0,
                rejected.error.code(),
            ));
        }

        for bench in &plan.benchmarks {
            pb.set_message(bench.name.clone());
            results.push(self.execute_single(bench)?);
            pb.inc(1);
        }

        pb.finish_with_message("Complete");
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    /// Execute every round of a single benchmark
    fn execute_single(&self, bench: &PlannedBenchmark) -> Result<BenchmarkResult, SupervisorError> {
        let mut result = BenchmarkResult::new(&bench.name, 0);

        for round in 0..self.config.rounds.max(1) {
            result.round = round;
            let raws: Vec<Result<String, String>> = self
                .supervisor
                .run_all(self.runner, &bench.commands)?
                .into_iter()
                .map(|r| r.map_err(|e| e.to_string()))
                .collect();

            let outcomes = collect_outcomes(&bench.name, bench.parser, &bench.commands, &raws);

            for (idx, (raw, outcome)) in raws.iter().zip(outcomes).enumerate() {
                let raw = raw.as_deref().unwrap_or_default();
                result.record(idx, raw, outcome, self.config.log_raw_data);
            }
        }

        info!(
            benchmark = %bench.name,
            metrics = result.metric_count(),
            code = ?result.return_code,
            "Benchmark finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BenchmarkSpec, SweepConfig};
    use crate::planner::build_plan;
    use crate::supervisor::ExecutionError;
    use std::path::Path;
    use std::time::Duration;
    use sweepbench_core::{Command, GemmOptions, NvbenchOptions, ReturnCode};

    /// Answers like `cublaslt_gemm`, except for `-t bf16` which prints garbage
    struct FakeGemm;

    impl CommandRunner for FakeGemm {
        fn run(&self, command: &Command, _timeout: Duration) -> Result<String, ExecutionError> {
            let get = |flag| command.flag_value(flag).unwrap_or("?");
            match get("-t") {
                "bf16" => Ok("bad output".to_string()),
                "int8" => Err(ExecutionError::NonZeroExit {
                    program: command.program().to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "CUDA error".to_string(),
                }),
                ty => Ok(format!(
                    "{} {} {} {} {} 100.5\n",
                    get("-m"),
                    get("-n"),
                    get("-k"),
                    get("-b"),
                    ty
                )),
            }
        }
    }

    fn quiet(rounds: usize) -> ExecutionConfig {
        ExecutionConfig {
            rounds,
            log_raw_data: false,
            progress: false,
        }
    }

    fn gemm_config(in_types: &[&str]) -> SweepConfig {
        let mut config = SweepConfig::default();
        config.benchmarks.insert(
            "cublaslt-gemm".to_string(),
            BenchmarkSpec::Gemm {
                binary: "cublaslt_gemm".to_string(),
                options: GemmOptions {
                    shapes: vec!["64,128,256".to_string()],
                    in_types: in_types.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                },
            },
        );
        config
    }

    #[test]
    fn test_execute_records_metrics() {
        let plan = build_plan(&gemm_config(&["fp16", "fp32"]), None, Path::new("/mock"));
        let executor = Executor::new(quiet(1), Supervisor::new(Duration::from_secs(1), 2), &FakeGemm);

        let results = executor.execute(&plan).unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.return_code, ReturnCode::Success);
        assert_eq!(result.result["fp16_fp16_64_128_256_flops"], vec![100.5]);
        assert_eq!(result.result["fp32_fp32_64_128_256_flops"], vec![100.5]);
        assert_eq!(result.raw_data.len(), 2);
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let plan = build_plan(
            &gemm_config(&["fp16", "bf16", "fp32"]),
            None,
            Path::new("/mock"),
        );
        let executor = Executor::new(quiet(1), Supervisor::new(Duration::from_secs(1), 1), &FakeGemm);

        let result = &executor.execute(&plan).unwrap()[0];
        assert_eq!(
            result.return_code,
            ReturnCode::MicrobenchmarkResultParsingFailure
        );
        assert_eq!(result.result.len(), 2);
        assert_eq!(result.raw_data["raw_output_1"], vec!["bad output".to_string()]);
        assert!(result.failures.contains_key(&1));
    }

    #[test]
    fn test_execution_failure_is_classified() {
        let plan = build_plan(&gemm_config(&["int8", "fp16"]), None, Path::new("/mock"));
        let executor = Executor::new(quiet(1), Supervisor::new(Duration::from_secs(1), 1), &FakeGemm);

        let result = &executor.execute(&plan).unwrap()[0];
        assert_eq!(result.return_code, ReturnCode::MicrobenchmarkExecutionFailure);
        assert_eq!(result.result.len(), 1);
        assert!(result.failures[&0].message.contains("CUDA error"));
    }

    #[test]
    fn test_rounds_accumulate() {
        let plan = build_plan(&gemm_config(&["fp16"]), None, Path::new("/mock"));
        let executor = Executor::new(quiet(3), Supervisor::new(Duration::from_secs(1), 1), &FakeGemm);

        let result = &executor.execute(&plan).unwrap()[0];
        assert_eq!(result.round, 2);
        assert_eq!(result.result["fp16_fp16_64_128_256_flops"].len(), 3);
        assert_eq!(result.raw_data["raw_output_0"].len(), 3);
    }

    #[test]
    fn test_rejected_benchmark_reported() {
        let mut config = gemm_config(&["fp16"]);
        config.benchmarks.insert(
            "anonymous".to_string(),
            BenchmarkSpec::Nvbench {
                binary: String::new(),
                options: NvbenchOptions::default(),
            },
        );
        let plan = build_plan(&config, None, Path::new("/mock"));
        let executor = Executor::new(quiet(1), Supervisor::new(Duration::from_secs(1), 1), &FakeGemm);

        let results = executor.execute(&plan).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "anonymous");
        assert_eq!(
            results[0].return_code,
            ReturnCode::MicrobenchmarkBinaryNameNotSet
        );
        assert_eq!(results[1].return_code, ReturnCode::Success);
    }
}
