//! Output Formatting
//!
//! Human-readable rendering of results for terminal display.

use crate::result::{BenchmarkResult, RunSummary};
use gridbench_core::CaseOutcome;
use std::collections::BTreeMap;

/// Render nanoseconds with a unit suited to the magnitude
pub fn format_duration(nanos: f64) -> String {
    if !nanos.is_finite() {
        return format!("{nanos} ns");
    }
    let abs = nanos.abs();
    if abs < 1_000.0 {
        format!("{nanos:.2} ns")
    } else if abs < 1_000_000.0 {
        format!("{:.2} µs", nanos / 1_000.0)
    } else if abs < 1_000_000_000.0 {
        format!("{:.2} ms", nanos / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos / 1_000_000_000.0)
    }
}

/// Render bytes with a binary unit
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Format results grouped by benchmark, followed by the run summary
pub fn format_human_output(results: &[BenchmarkResult], summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("gridbench results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    let mut groups: BTreeMap<&str, Vec<&BenchmarkResult>> = BTreeMap::new();
    for result in results {
        groups.entry(&result.id.benchmark).or_default().push(result);
    }

    for (benchmark, results) in groups {
        output.push_str(&format!("{benchmark}\n"));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for result in results {
            let icon = if result.is_completed() { "✓" } else { "✗" };
            let mut label = result.id.operation.clone();
            if !result.id.parameters.is_empty() {
                label.push_str(&format!("({})", result.id.parameters));
            }
            output.push_str(&format!("  {icon} {label} [{}]\n", result.id.job));

            if let Some(stats) = &result.statistics {
                let spread = result
                    .std_dev_ns()
                    .map(format_duration)
                    .unwrap_or_else(|| "n/a".to_string());
                output.push_str(&format!(
                    "      mean: {}  median: {}  stddev: {}\n",
                    format_duration(stats.mean),
                    format_duration(stats.median),
                    spread
                ));
                output.push_str(&format!(
                    "      min: {}  max: {}  p95: {}  samples: {} x {} ops\n",
                    format_duration(stats.min),
                    format_duration(stats.max),
                    format_duration(stats.percentiles.p95),
                    stats.sample_count,
                    result.ops_per_sample
                ));
                if stats.outliers.total() > 0 {
                    output.push_str(&format!(
                        "      outliers: {} low, {} high\n",
                        stats.outliers.low, stats.outliers.high
                    ));
                }
            }
            if let Some(diag) = &result.diagnostics {
                let precision = if diag.imprecise { " (imprecise)" } else { "" };
                output.push_str(&format!(
                    "      allocated: {}/op in {:.1} allocs/op, retained: {}/op{}\n",
                    format_bytes(diag.allocated_bytes_per_op),
                    diag.allocations_per_op,
                    format_bytes(diag.retained_bytes_per_op),
                    precision
                ));
            }
            if let CaseOutcome::Failed { reason, message } = &result.outcome {
                output.push_str(&format!("      failed ({reason}): {message}\n"));
            }
            if let Some(err) = &result.cleanup_error {
                output.push_str(&format!("      cleanup error: {err}\n"));
            }
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "{} cases: {} completed, {} failed ({} setup, {} iteration, {} timeout)",
        summary.total,
        summary.completed,
        summary.failed(),
        summary.setup_failures,
        summary.iteration_failures,
        summary.timeouts
    ));
    if summary.sink_errors > 0 {
        output.push_str(&format!(", {} sink errors", summary.sink_errors));
    }
    output.push_str(&format!(
        " in {}\n",
        format_duration(summary.duration_ns as f64)
    ));
    output
}
