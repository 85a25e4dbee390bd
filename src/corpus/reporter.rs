//! Corpus run reporting
//!
//! The runner reports through the `CorpusReporter` trait so the console output,
//! JSON output and silent runs share one execution path.

use std::io::{self, Write};
use std::path::Path;

use serde_json::{Value, json};

use super::runner::{FailureReason, RunSummary, TestResult};

/// Trait for reporting corpus execution progress and results.
pub trait CorpusReporter {
    /// Called once discovery has finished
    fn on_discovered(&mut self, _corpus_dir: &Path, _extension: &str, _count: usize) {}

    /// Called before a file is executed
    fn on_file_start(&mut self, _filename: &str) {}

    /// Called when a file has been executed
    fn on_file_complete(&mut self, result: &TestResult);

    /// Called when every file has been executed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Reporter that discards everything
pub struct NullReporter;

impl CorpusReporter for NullReporter {
    fn on_file_complete(&mut self, _result: &TestResult) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Human-readable, line-per-file console output
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl CorpusReporter for ConsoleReporter {
    fn on_discovered(&mut self, corpus_dir: &Path, extension: &str, count: usize) {
        if count == 0 {
            println!("No '*{}' files found in {}", extension, corpus_dir.display());
        }
    }

    fn on_file_start(&mut self, filename: &str) {
        print!("Running {}... ", filename);
        let _ = io::stdout().flush();
    }

    fn on_file_complete(&mut self, result: &TestResult) {
        println!("{}", format_status(result));

        match result.failure_reason() {
            Some(FailureReason::NonZeroExit) => {
                println!("--- Stderr ---");
                println!("{}", result.captured_output());
            }
            None if self.verbose && !result.captured_output().is_empty() => {
                println!("--- Stdout ---");
                println!("{}", result.captured_output());
            }
            _ => {}
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        println!();
        println!("{}", format_summary_line(summary));
    }
}

/// Single status fragment printed after `Running <file>...`
pub fn format_status(result: &TestResult) -> String {
    match result.failure_reason() {
        None => format!("✅ Passed ({:.2}s)", result.duration_seconds()),
        Some(FailureReason::NonZeroExit) => match result.exit_code() {
            Some(code) => format!("❌ Failed (Return Code: {})", code),
            None => "❌ Failed (terminated by signal)".to_string(),
        },
        Some(FailureReason::Timeout) => "❌ Timed Out".to_string(),
        Some(FailureReason::ProcessError) => format!("❌ Error: {}", result.captured_output()),
    }
}

/// `Summary: <passed>/<total> tests passed.`
pub fn format_summary_line(summary: &RunSummary) -> String {
    format!("Summary: {}/{} tests passed.", summary.passed(), summary.total())
}

/// Emits one JSON document once the run completes
#[derive(Default)]
pub struct JsonReporter;

impl CorpusReporter for JsonReporter {
    fn on_file_complete(&mut self, _result: &TestResult) {}

    fn on_run_complete(&mut self, summary: &RunSummary) {
        match serde_json::to_string_pretty(&summary_to_json(summary)) {
            Ok(doc) => println!("{}", doc),
            Err(e) => tracing::error!(error = %e, "failed to serialize corpus report"),
        }
    }
}

/// Machine-readable form of a run summary
pub fn summary_to_json(summary: &RunSummary) -> Value {
    let results: Vec<Value> = summary
        .results()
        .iter()
        .map(|r| {
            json!({
                "filename": r.filename(),
                "passed": r.passed(),
                "duration_seconds": r.duration_seconds(),
                "captured_output": r.captured_output(),
                "failure_reason": r.failure_reason().map(FailureReason::as_str),
                "exit_code": r.exit_code(),
            })
        })
        .collect();

    json!({
        "total": summary.total(),
        "passed": summary.passed(),
        "failed": summary.failed(),
        "results": results,
    })
}
