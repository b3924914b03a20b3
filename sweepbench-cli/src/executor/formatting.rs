//! Output Formatting
//!
//! Human-readable and JSON output for benchmark results.

use sweepbench_core::{BenchmarkResult, ReturnCode};

/// Format results for human-readable terminal display
pub fn format_human_output(results: &[BenchmarkResult]) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("SweepBench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for result in results {
        let status_icon = if result.return_code == ReturnCode::Success {
            "✓"
        } else {
            "✗"
        };
        output.push_str(&format!(
            "{} {} [{:?} = {}]\n",
            status_icon,
            result.name,
            result.return_code,
            result.return_code.value()
        ));

        for (metric, values) in &result.result {
            let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
            output.push_str(&format!(
                "    {}: {:.3} ({} sample{})\n",
                metric,
                mean,
                values.len(),
                if values.len() == 1 { "" } else { "s" }
            ));
        }

        for (idx, failure) in &result.failures {
            output.push_str(&format!("    command #{}: {}\n", idx, failure.message));
        }
        output.push('\n');
    }

    // Summary
    let failed = results
        .iter()
        .filter(|r| r.return_code != ReturnCode::Success)
        .count();
    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Benchmarks: {}  Passed: {}  Failed: {}\n",
        results.len(),
        results.len() - failed,
        failed
    ));

    output
}

/// Serialize results as pretty JSON
pub fn format_json_output(results: &[BenchmarkResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}
