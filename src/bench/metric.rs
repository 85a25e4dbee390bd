//! Metric line parsing
//!
//! Benchmarks report their own timing on stdout as a line containing
//! `Time (ms):`. Only the first such line counts: its text after the first
//! colon (up to any further colon) is trimmed and parsed as a float.

/// Marker identifying the metric line
pub const METRIC_MARKER: &str = "Time (ms):";

/// Extract the self-reported time in milliseconds from program output.
///
/// Returns `None` when no line carries the marker or the first one that does
/// has no parsable value. Later metric lines are never consulted.
pub fn parse_metric(output: &str) -> Option<f64> {
    let line = output.lines().find(|line| line.contains(METRIC_MARKER))?;
    line.split(':').nth(1)?.trim().parse::<f64>().ok()
}
