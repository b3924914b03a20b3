//! Result Parsing and Failure Classification
//!
//! Raw executable output is turned into a [`RunOutcome`]: either parsed
//! metrics or a classified [`RunFailure`] that keeps the raw text. Failures
//! are values, not panics, so one malformed output never stops the sweep.
//!
//! ```text
//! (cmd_idx, raw) ──► raw_data["raw_output_{idx}"]      (always)
//!        │
//!        ▼
//!   OutputParser::classify ──► Success(metrics) ──► result[name] += value
//!                          └─► Failed(failure)  ──► return_code, error log
//! ```

use crate::command::Command;
use crate::units::{MetricUnit, UnitParseError, parse_percentage, parse_time_to_us};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

/// Number of whitespace-separated fields in a GEMM result line
pub const GEMM_FIELD_COUNT: usize = 6;

/// Failure message for a command whose output never reached the parser
pub const NO_OUTPUT_COLLECTED: &str = "no output collected";

/// Classification codes reported per benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnCode {
    /// Everything parsed
    Success,
    /// Invalid user-supplied configuration
    InvalidArgument,
    /// The benchmark definition never named its executable
    MicrobenchmarkBinaryNameNotSet,
    /// The executable could not be run or exited abnormally
    MicrobenchmarkExecutionFailure,
    /// The executable's output did not match the expected format
    MicrobenchmarkResultParsingFailure,
    /// A requested data type is not supported by the executable
    MicrobenchmarkUnsupportedDataType,
}

impl ReturnCode {
    /// Numeric code
    pub fn value(self) -> i32 {
        match self {
            ReturnCode::Success => 0,
            ReturnCode::InvalidArgument => 1,
            ReturnCode::MicrobenchmarkBinaryNameNotSet => 11,
            ReturnCode::MicrobenchmarkExecutionFailure => 13,
            ReturnCode::MicrobenchmarkResultParsingFailure => 14,
            ReturnCode::MicrobenchmarkUnsupportedDataType => 16,
        }
    }
}

/// Why a raw output could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResultParseError {
    #[error("Invalid result: expected {expected} fields, got {found}")]
    WrongFieldCount { expected: usize, found: usize },

    #[error("Invalid result: shape field {index} '{token}' is not a number")]
    NonDigitShapeField { index: usize, token: String },

    #[error("Invalid result: metric '{0}' is not a number")]
    InvalidMetric(String),

    #[error("No result table found in output")]
    MissingTable,

    #[error("Malformed table row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Invalid value in column '{column}': {source}")]
    InvalidCell {
        column: String,
        #[source]
        source: UnitParseError,
    },
}

/// A single normalized metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetric {
    /// Result key
    pub name: String,
    /// Normalized value
    pub value: f64,
    /// Unit of `value`
    pub unit: MetricUnit,
}

/// A classified, non-fatal failure of one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Classification
    pub code: ReturnCode,
    /// Human-readable reason
    pub message: String,
    /// Raw output (or execution diagnostics) kept for debugging
    pub raw: String,
}

/// Outcome of one command
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Output parsed into metrics
    Success(Vec<ParsedMetric>),
    /// Output rejected or execution failed
    Failed(RunFailure),
}

impl RunOutcome {
    /// Whether this outcome carries metrics
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    /// The failure, if any
    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Failed(f) => Some(f),
        }
    }

    /// Outcome for a command that could not be executed at all
    pub fn execution_failure(message: impl Into<String>) -> Self {
        RunOutcome::Failed(RunFailure {
            code: ReturnCode::MicrobenchmarkExecutionFailure,
            message: message.into(),
            raw: String::new(),
        })
    }
}

/// Output format of an executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputParser {
    /// `M N K B TYPE VALUE` single line
    GemmLine,
    /// NVBench markdown table
    NvbenchTable,
}

impl OutputParser {
    /// Parse `raw` produced by `command` for benchmark `benchmark`.
    pub fn parse(
        self,
        benchmark: &str,
        command: &Command,
        raw: &str,
    ) -> Result<Vec<ParsedMetric>, ResultParseError> {
        match self {
            OutputParser::GemmLine => parse_gemm_output(command, raw).map(|m| vec![m]),
            OutputParser::NvbenchTable => parse_nvbench_table(benchmark, raw),
        }
    }

    /// Parse and classify; never fails.
    pub fn classify(self, benchmark: &str, command: &Command, raw: &str) -> RunOutcome {
        match self.parse(benchmark, command, raw) {
            Ok(metrics) => RunOutcome::Success(metrics),
            Err(e) => RunOutcome::Failed(RunFailure {
                code: ReturnCode::MicrobenchmarkResultParsingFailure,
                message: e.to_string(),
                raw: raw.to_string(),
            }),
        }
    }
}

/// Classify the raw output of every command.
///
/// `raws[i]` is the output of `commands[i]`, or the execution error message
/// when the command could not be run. Outcomes are independent, so they are
/// computed in parallel; the result keeps the input order.
///
/// Exactly one outcome is returned per command. A command with no entry in
/// `raws` is an execution failure; surplus entries are ignored.
pub fn collect_outcomes(
    benchmark: &str,
    parser: OutputParser,
    commands: &[Command],
    raws: &[Result<String, String>],
) -> Vec<RunOutcome> {
    commands
        .par_iter()
        .enumerate()
        .map(|(idx, command)| match raws.get(idx) {
            Some(Ok(output)) => parser.classify(benchmark, command, output),
            Some(Err(message)) => RunOutcome::execution_failure(message.clone()),
            None => RunOutcome::execution_failure(NO_OUTPUT_COLLECTED),
        })
        .collect()
}

/// Parse one GEMM result line: `M N K B TYPE VALUE`.
///
/// The metric is named `{command tail}_{type}_{m}_{n}_{k}_flops`.
pub fn parse_gemm_output(command: &Command, raw: &str) -> Result<ParsedMetric, ResultParseError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() != GEMM_FIELD_COUNT {
        return Err(ResultParseError::WrongFieldCount {
            expected: GEMM_FIELD_COUNT,
            found: fields.len(),
        });
    }

    for (index, token) in fields[..4].iter().enumerate() {
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResultParseError::NonDigitShapeField {
                index,
                token: token.to_string(),
            });
        }
    }

    let value = fields[5]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ResultParseError::InvalidMetric(fields[5].to_string()))?;

    Ok(ParsedMetric {
        name: format!(
            "{}_{}_{}_flops",
            command.tail(),
            fields[4],
            fields[..3].join("_")
        ),
        value,
        unit: MetricUnit::Rate,
    })
}

/// Parse NVBench markdown result tables.
///
/// ```text
/// ### [0] NVIDIA A100
///
/// | Duration (us) | Samples | CPU Time  | Noise | GPU Time  | Noise |
/// |---------------|---------|-----------|-------|-----------|-------|
/// |            25 |  11000x | 35.064 us | 3.22% | 29.781 us | 1.08% |
/// ```
///
/// NVBench prints one table per device; every table is parsed on its own.
/// A `### [N]` heading above a table adds `devN` to its metric names.
/// Columns before `Samples` are axis values and name the row. `... Time`
/// columns become microseconds, `Noise` columns percentages. A repeated
/// `Noise` header belongs to the time column right before it.
pub fn parse_nvbench_table(
    benchmark: &str,
    raw: &str,
) -> Result<Vec<ParsedMetric>, ResultParseError> {
    let tables = split_tables(raw);
    if tables.is_empty() {
        return Err(ResultParseError::MissingTable);
    }

    let mut metrics = Vec::new();
    for table in &tables {
        metrics.extend(parse_table(benchmark, table)?);
    }
    Ok(metrics)
}

/// Consecutive `|` rows, with the device heading they appeared under
struct Table<'a> {
    device: Option<u32>,
    rows: Vec<Vec<&'a str>>,
}

/// Group `|` rows into tables. Any other line ends the current table.
fn split_tables(raw: &str) -> Vec<Table<'_>> {
    let mut tables = Vec::new();
    let mut device = None;
    let mut current: Option<Table<'_>> = None;

    for line in raw.lines().map(str::trim) {
        if line.starts_with('|') {
            current
                .get_or_insert_with(|| Table {
                    device,
                    rows: Vec::new(),
                })
                .rows
                .push(split_row(line));
            continue;
        }

        tables.extend(current.take());
        if line.starts_with("## ") {
            // New benchmark section
            device = None;
        } else if let Some(idx) = device_heading(line) {
            device = Some(idx);
        }
    }
    tables.extend(current);
    tables
}

/// Device index of a `### [N] <name>` heading
fn device_heading(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("###")?.trim_start().strip_prefix('[')?;
    let (idx, _) = rest.split_once(']')?;
    idx.trim().parse().ok()
}

fn parse_table(benchmark: &str, table: &Table<'_>) -> Result<Vec<ParsedMetric>, ResultParseError> {
    let Some((header, rest)) = table.rows.split_first() else {
        return Err(ResultParseError::MissingTable);
    };
    let data: Vec<&Vec<&str>> = rest.iter().filter(|r| !is_separator(r)).collect();
    if data.is_empty() {
        return Err(ResultParseError::MissingTable);
    }

    let samples_col = header.iter().position(|h| *h == "Samples").ok_or_else(|| {
        ResultParseError::MalformedRow {
            row: 0,
            reason: "missing 'Samples' column".to_string(),
        }
    })?;

    // Qualify each Noise column with the time column it follows
    let mut columns = Vec::with_capacity(header.len());
    let mut last_time = String::new();
    for h in header.iter() {
        let name = column_key(h);
        if h.ends_with("Time") {
            last_time = name.clone();
            columns.push(name);
        } else if *h == "Noise" && !last_time.is_empty() {
            columns.push(format!("{}_noise", last_time));
        } else {
            columns.push(name);
        }
    }

    let mut base = vec![benchmark.to_string()];
    base.extend(table.device.map(|d| format!("dev{}", d)));

    let mut metrics = Vec::new();
    for (row_idx, row) in data.iter().enumerate() {
        if row.len() != header.len() {
            return Err(ResultParseError::MalformedRow {
                row: row_idx + 1,
                reason: format!("expected {} cells, got {}", header.len(), row.len()),
            });
        }

        let mut prefix = base.clone();
        prefix.extend(row[..samples_col].iter().map(|v| column_key(v)));
        let prefix = prefix.join("_");

        for (col, cell) in row.iter().enumerate().skip(samples_col) {
            let header_name = header[col];
            let cell_err = |source| ResultParseError::InvalidCell {
                column: header_name.to_string(),
                source,
            };
            let (value, unit) = if col == samples_col {
                let count = cell.trim_end_matches('x');
                (parse_percentage(count).map_err(cell_err)?, MetricUnit::Rate)
            } else if header_name.ends_with("Time") {
                (parse_time_to_us(cell).map_err(cell_err)?, MetricUnit::Microseconds)
            } else if header_name == "Noise" {
                (parse_percentage(cell).map_err(cell_err)?, MetricUnit::Percent)
            } else {
                // Throughput and other columns are not normalized
                continue;
            };

            metrics.push(ParsedMetric {
                name: format!("{}_{}", prefix, columns[col]),
                value,
                unit,
            });
        }
    }
    Ok(metrics)
}

fn split_row(line: &str) -> Vec<&str> {
    line.trim_matches('|').split('|').map(str::trim).collect()
}

fn is_separator(row: &[&str]) -> bool {
    row.iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

fn column_key(header: &str) -> String {
    header
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Accumulated results of one benchmark round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Benchmark name
    pub name: String,
    /// Round index this result belongs to
    pub round: usize,
    /// Overall classification
    pub return_code: ReturnCode,
    /// Raw outputs keyed by `raw_output_{cmd_idx}`
    pub raw_data: BTreeMap<String, Vec<String>>,
    /// Metric values keyed by metric name
    pub result: BTreeMap<String, Vec<f64>>,
    /// Failed commands by index
    pub failures: BTreeMap<usize, RunFailure>,
}

impl BenchmarkResult {
    /// Empty, successful result
    pub fn new(name: impl Into<String>, round: usize) -> Self {
        Self {
            name: name.into(),
            round,
            return_code: ReturnCode::Success,
            raw_data: BTreeMap::new(),
            result: BTreeMap::new(),
            failures: BTreeMap::new(),
        }
    }

    /// Result for a benchmark that failed before any command ran
    pub fn from_error(name: impl Into<String>, round: usize, code: ReturnCode) -> Self {
        let mut result = Self::new(name, round);
        result.return_code = code;
        result
    }

    /// Store raw output verbatim; `log` also echoes it to the log.
    pub fn add_raw_data(&mut self, key: impl Into<String>, value: impl Into<String>, log: bool) {
        let key = key.into();
        let value = value.into();
        if log {
            info!(benchmark = %self.name, key = %key, "{}", value);
        }
        self.raw_data.entry(key).or_default().push(value);
    }

    /// Append a metric value
    pub fn add_result(&mut self, name: impl Into<String>, value: f64) {
        self.result.entry(name.into()).or_default().push(value);
    }

    /// Overwrite the return code
    pub fn set_return_code(&mut self, code: ReturnCode) {
        self.return_code = code;
    }

    /// Record the outcome of command `cmd_idx` whose raw output was `raw`.
    ///
    /// The raw output is retained whatever the outcome. Returns `true` when
    /// the outcome carried metrics.
    pub fn record(&mut self, cmd_idx: usize, raw: &str, outcome: RunOutcome, log_raw: bool) -> bool {
        self.add_raw_data(format!("raw_output_{}", cmd_idx), raw, log_raw);

        match outcome {
            RunOutcome::Success(metrics) => {
                for metric in metrics {
                    self.add_result(metric.name, metric.value);
                }
                true
            }
            RunOutcome::Failed(failure) => {
                self.set_return_code(failure.code);
                let summary = match failure.code {
                    ReturnCode::MicrobenchmarkResultParsingFailure => "The result format is invalid",
                    _ => "The benchmark command failed",
                };
                error!(
                    round = self.round,
                    benchmark = %self.name,
                    raw_output = %failure.raw,
                    message = %failure.message,
                    "{}",
                    summary
                );
                self.failures.insert(cmd_idx, failure);
                false
            }
        }
    }

    /// Parse and record the raw output of command `cmd_idx`.
    pub fn process_raw_output(
        &mut self,
        cmd_idx: usize,
        command: &Command,
        raw: &str,
        parser: OutputParser,
        log_raw: bool,
    ) -> bool {
        let outcome = parser.classify(&self.name, command, raw);
        self.record(cmd_idx, raw, outcome, log_raw)
    }

    /// Number of metric values recorded
    pub fn metric_count(&self) -> usize {
        self.result.values().map(Vec::len).sum()
    }
}
