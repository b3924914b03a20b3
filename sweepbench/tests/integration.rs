//! Integration tests for SweepBench
//!
//! These tests verify the end-to-end behavior of the pipeline: configuration
//! through command construction, execution and result classification.

use std::path::{Path, PathBuf};
use std::time::Duration;
use sweepbench::{
    BenchmarkBinary, BenchmarkResult, Command, CommandRunner, ConfigError, ExecutionConfig,
    ExecutionError, Executor, GemmOptions, IbDeviceSelection, NvbenchOptions, OutputParser,
    ProcessRunner, ReturnCode, ShapeAxis, Supervisor, SweepConfig, build_plan, cross_product,
    parse_ib_devices, parse_range, parse_time_to_us,
};

fn quiet() -> ExecutionConfig {
    ExecutionConfig {
        rounds: 1,
        log_raw_data: false,
        progress: false,
    }
}

/// Token normalization is independent of padding and suffix
#[test]
fn test_time_tokens_normalize_to_microseconds() {
    let cases = [
        ("1000 ns", 1.0),
        ("1 ms", 1000.0),
        ("1 s", 1_000_000.0),
        ("50.5%", 50.5),
        ("123.45", 123.45),
        ("12 us", 12.0),
    ];
    for (token, expected) in cases {
        assert_eq!(parse_time_to_us(token).unwrap(), expected, "{token}");
        let padded = format!("  {token}\t");
        assert_eq!(parse_time_to_us(&padded).unwrap(), expected, "{padded:?}");
    }
    assert!(parse_time_to_us("fast us").is_err());
}

/// Sweep cardinality is the product of axis lengths, and repeatable
#[test]
fn test_sweep_cardinality() {
    let axes = [
        ShapeAxis::new("m", parse_range("1:8").unwrap()).unwrap(),
        ShapeAxis::new("n", vec![64, 128]).unwrap(),
        ShapeAxis::new("k", vec![32]).unwrap(),
    ];
    let first = cross_product(&axes);
    assert_eq!(first.len(), 4 * 2 * 1);
    assert_eq!(first, cross_product(&axes));
    assert_eq!(first[0], vec![1, 64, 32]);
    assert_eq!(first[7], vec![8, 128, 32]);
}

/// Default NVBench parameters produce the documented command tail
#[test]
fn test_default_nvbench_command() {
    let binary = BenchmarkBinary::new("nvbench-sleep", "nvbench_sleep_kernel", "/opt/bin").unwrap();
    let params = NvbenchOptions::default().validate(binary).unwrap();
    let cmd = params.commands()[0].to_string();

    assert_eq!(
        cmd,
        "/opt/bin/nvbench_sleep_kernel --timeout 15 --min-samples 10 \
         --stopping-criterion stdrel --min-time 0.5 --max-noise 0.5"
    );
    assert!(!cmd.contains("--max-angle"));
    assert!(!cmd.contains("--min-r2"));
}

/// Mode tag decides which group is emitted, never both
#[test]
fn test_stopping_criterion_groups_are_exclusive() {
    let binary = BenchmarkBinary::new("nvbench-sleep", "nvbench_sleep_kernel", "/opt/bin").unwrap();
    let params = NvbenchOptions {
        stopping_criterion: Some("entropy".to_string()),
        min_time: Some(2.0),
        max_noise: Some(0.1),
        ..Default::default()
    }
    .validate(binary.clone())
    .unwrap();
    let cmd = &params.commands()[0];
    assert_eq!(cmd.flag_value("--max-angle"), Some("0.048"));
    assert_eq!(cmd.flag_value("--min-r2"), Some("0.36"));
    assert!(!cmd.has_flag("--min-time"));
    assert!(!cmd.has_flag("--max-noise"));

    let err = NvbenchOptions {
        stopping_criterion: Some("fastest".to_string()),
        ..Default::default()
    }
    .validate(binary)
    .unwrap_err();
    assert_eq!(err.code(), ReturnCode::InvalidArgument);
}

/// Mixed IB device lists fail before any command is built
#[test]
fn test_ib_devices_validation() {
    let err = parse_ib_devices("0,mlx5_ib2").unwrap_err();
    assert!(matches!(err, ConfigError::MixedDeviceList(_)));
    assert!(err.to_string().contains("mixed numeric indices and device names"));

    assert_eq!(
        parse_ib_devices("0,2,4,6").unwrap(),
        IbDeviceSelection::Indices(vec![0, 2, 4, 6])
    );
    assert_eq!(
        parse_ib_devices("mlx5_ib0,mlx5_ib2").unwrap(),
        IbDeviceSelection::Names(vec!["mlx5_ib0".to_string(), "mlx5_ib2".to_string()])
    );
}

/// Raw GEMM output is keyed by the command tail; bad output stays isolated
#[test]
fn test_gemm_result_processing() {
    let binary = BenchmarkBinary::new("cublaslt-gemm", "cublaslt_gemm", "/opt/bin").unwrap();
    let params = GemmOptions {
        shapes: vec!["128,256,64".to_string()],
        batch: "4".to_string(),
        in_types: vec!["fp16".to_string(), "fp32".to_string()],
        ..Default::default()
    }
    .validate(binary, sweepbench::CUBLASLT_IN_TYPES)
    .unwrap();
    let commands = params.commands();
    assert_eq!(commands.len(), 2);

    let mut result = BenchmarkResult::new("cublaslt-gemm", 0);
    assert!(result.process_raw_output(
        0,
        &commands[0],
        "128 256 64 4 fp16 512.3",
        OutputParser::GemmLine,
        false
    ));
    assert!(!result.process_raw_output(
        1,
        &commands[1],
        "bad output",
        OutputParser::GemmLine,
        false
    ));

    assert_eq!(result.result["fp16_fp16_128_256_64_flops"], vec![512.3]);
    assert_eq!(result.result.len(), 1);
    assert_eq!(
        result.return_code,
        ReturnCode::MicrobenchmarkResultParsingFailure
    );
    assert_eq!(result.raw_data["raw_output_0"], vec!["128 256 64 4 fp16 512.3".to_string()]);
    assert_eq!(result.raw_data["raw_output_1"], vec!["bad output".to_string()]);
}

/// Configuration errors carry their own return codes
#[test]
fn test_configuration_error_codes() {
    let err = BenchmarkBinary::new("anonymous", "", "/opt/bin").unwrap_err();
    assert_eq!(err.code(), ReturnCode::MicrobenchmarkBinaryNameNotSet);

    let binary = BenchmarkBinary::new("cublaslt-gemm", "cublaslt_gemm", "/opt/bin").unwrap();
    let err = GemmOptions {
        in_types: vec!["fp12".to_string()],
        ..Default::default()
    }
    .validate(binary, sweepbench::CUBLASLT_IN_TYPES)
    .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedDataType { .. }));
    assert_eq!(err.code(), ReturnCode::MicrobenchmarkUnsupportedDataType);

    assert_eq!(parse_range("2:8:*2").unwrap(), vec![2, 4, 8]);
}

/// Canned executables: GEMM echoes its shape, NVBench prints one table per device
struct CannedRunner;

const NVBENCH_TABLE: &str = "\
## sleep

### [0] NVIDIA A100

| Duration (us) | Samples | CPU Time  | Noise | GPU Time  | Noise |
|---------------|---------|-----------|-------|-----------|-------|
|            25 |  11000x | 35.064 us | 3.22% | 29.781 us | 1.08% |

### [1] NVIDIA A100

| Duration (us) | Samples | CPU Time  | Noise | GPU Time  | Noise |
|---------------|---------|-----------|-------|-----------|-------|
|            25 |  10800x | 36.002 us | 2.90% | 30.410 us | 0.97% |
";

impl CommandRunner for CannedRunner {
    fn run(&self, command: &Command, _timeout: Duration) -> Result<String, ExecutionError> {
        if command.program().ends_with("nvbench_sleep_kernel") {
            return Ok(NVBENCH_TABLE.to_string());
        }
        let get = |flag| command.flag_value(flag).unwrap_or("x");
        Ok(format!(
            "{} {} {} {} {} 1000.0",
            get("-m"),
            get("-n"),
            get("-k"),
            get("-b"),
            get("-t")
        ))
    }
}

/// sweep.toml → plan → execution → JSON results
#[test]
fn test_end_to_end_from_toml() {
    let config: SweepConfig = toml::from_str(
        r#"
        [runner]
        bin_dir = "/opt/bin"

        [benchmarks.cublaslt-gemm]
        kind = "gemm"
        shapes = ["2:8:*2,64,64"]
        batch = "0:1:1"
        in_types = ["fp16", "bf16"]

        [benchmarks.nvbench-sleep-kernel]
        kind = "nvbench"
        binary = "nvbench_sleep_kernel"
        devices = "0,1"
        stopping_criterion = "entropy"

        [benchmarks.unnamed]
        kind = "nvbench"
        "#,
    )
    .unwrap();

    let plan = build_plan(&config, None, &config.runner.bin_dir);
    assert_eq!(plan.command_count(), 3 * 2 * 2 + 1);
    assert_eq!(plan.rejected.len(), 1);

    let executor = Executor::new(quiet(), Supervisor::new(Duration::from_secs(1), 4), &CannedRunner);
    let results = executor.execute(&plan).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["cublaslt-gemm", "nvbench-sleep-kernel", "unnamed"]);

    let gemm = &results[0];
    assert_eq!(gemm.return_code, ReturnCode::Success);
    assert_eq!(gemm.result.len(), 3 * 2);
    // Batch 0 and 1 land on the same key, one value each
    assert_eq!(gemm.result["bf16_bf16_4_64_64_flops"], vec![1000.0, 1000.0]);
    assert_eq!(gemm.raw_data.len(), 12);

    let nvbench = &results[1];
    assert_eq!(nvbench.return_code, ReturnCode::Success);
    assert_eq!(nvbench.result.len(), 2 * 5);
    assert_eq!(nvbench.result["nvbench-sleep-kernel_dev0_25_samples"], vec![11000.0]);
    assert_eq!(nvbench.result["nvbench-sleep-kernel_dev0_25_gpu_time"], vec![29.781]);
    assert_eq!(nvbench.result["nvbench-sleep-kernel_dev1_25_gpu_time"], vec![30.41]);

    assert_eq!(
        results[2].return_code,
        ReturnCode::MicrobenchmarkBinaryNameNotSet
    );

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[2]["return_code"], "MICROBENCHMARK_BINARY_NAME_NOT_SET");
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sweepbench-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(dir: &Path, name: &str, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A real executable behind the process runner
#[test]
fn test_process_runner_end_to_end() {
    let dir = scratch_dir("bin");
    // Argument positions: -m M -n N -k K -b B -w W -i I -t T
    write_script(
        &dir,
        "cublaslt_gemm",
        "#!/bin/sh\nif [ \"${14}\" = int8 ]; then echo garbage; else echo \"$2 $4 $6 $8 ${14} 77.5\"; fi\n",
    );

    let mut config = SweepConfig::default();
    config.benchmarks.insert(
        "cublaslt-gemm".to_string(),
        sweepbench::BenchmarkSpec::Gemm {
            binary: "cublaslt_gemm".to_string(),
            options: GemmOptions {
                shapes: vec!["16,32,64".to_string()],
                in_types: vec!["fp16".to_string(), "int8".to_string()],
                ..Default::default()
            },
        },
    );

    let plan = build_plan(&config, None, &dir);
    let executor = Executor::new(
        quiet(),
        Supervisor::new(Duration::from_secs(10), 2),
        &ProcessRunner,
    );
    let results = executor.execute(&plan).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    let result = &results[0];
    assert_eq!(result.result["fp16_fp16_16_32_64_flops"], vec![77.5]);
    assert_eq!(
        result.return_code,
        ReturnCode::MicrobenchmarkResultParsingFailure
    );
    assert_eq!(result.raw_data["raw_output_1"], vec!["garbage\n".to_string()]);
}
