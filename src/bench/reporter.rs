//! Benchmark run reporting

use super::comparator::{BenchmarkRun, BenchmarkSample, BenchmarkSpec, Comparison, MetricSource, SampleFailure};

/// Trait for reporting benchmark progress and the final comparison.
pub trait BenchReporter {
    fn on_spec_start(&mut self, _spec: &BenchmarkSpec) {}

    fn on_sample(&mut self, sample: &BenchmarkSample);

    fn on_complete(&mut self, run: &BenchmarkRun);
}

/// Reporter that discards everything
pub struct NullBenchReporter;

impl BenchReporter for NullBenchReporter {
    fn on_sample(&mut self, _sample: &BenchmarkSample) {}

    fn on_complete(&mut self, _run: &BenchmarkRun) {}
}

const RULE: &str = "------------------------------";

/// Console output: each runtime's own output, then the comparison
#[derive(Default)]
pub struct ConsoleBenchReporter;

impl BenchReporter for ConsoleBenchReporter {
    fn on_spec_start(&mut self, spec: &BenchmarkSpec) {
        println!("🚀 Running {} benchmark...", spec.label);
    }

    fn on_sample(&mut self, sample: &BenchmarkSample) {
        if !sample.stdout().is_empty() {
            print!("{}", sample.stdout());
            if !sample.stdout().ends_with('\n') {
                println!();
            }
        }
        match sample.failure() {
            Some(SampleFailure::NonZeroExit { stderr, .. }) => {
                println!("❌ {} benchmark failed ({}):", sample.runtime_label(), failure_text(sample));
                println!("{}", stderr.trim_end());
            }
            Some(_) => println!("❌ {} benchmark: {}", sample.runtime_label(), failure_text(sample)),
            None => {}
        }
        println!("{}", RULE);
    }

    fn on_complete(&mut self, run: &BenchmarkRun) {
        for line in format_comparison(run) {
            println!("{}", line);
        }
    }
}

fn failure_text(sample: &BenchmarkSample) -> String {
    sample.failure().map(ToString::to_string).unwrap_or_default()
}

/// Result lines printed after all runtimes have run
pub fn format_comparison(run: &BenchmarkRun) -> Vec<String> {
    match run.comparison() {
        Comparison::Complete(report) => {
            let mut lines = vec!["📊 Comparison Results:".to_string()];
            for sample in run.samples() {
                lines.push(format_sample_time(sample));
            }
            let marker = if report.ratio < 1.0 { "🔥" } else { "🐢" };
            lines.push(format!("{} {}", marker, report.summary()));
            lines
        }
        Comparison::Incomplete { reason } => vec![format!("⚠️  Comparison incomplete: {}", reason)],
    }
}

fn format_sample_time(sample: &BenchmarkSample) -> String {
    match (sample.time_ms(), sample.source()) {
        (Some(ms), Some(MetricSource::WallClock)) => {
            format!("{}: {:.2} ms (wall clock)", sample.runtime_label(), ms)
        }
        (Some(ms), _) => format!("{}: {:.2} ms", sample.runtime_label(), ms),
        (None, _) => format!("{}: n/a ({})", sample.runtime_label(), failure_text(sample)),
    }
}
