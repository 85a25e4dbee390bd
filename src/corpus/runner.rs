//! Example corpus execution
//!
//! Runs every script in a flat corpus directory against the interpreter binary,
//! one at a time, in file-name order. A failing, crashing or hanging script is
//! recorded and the run moves on; only precondition failures (missing binary,
//! unreadable corpus directory) stop the run before anything executes.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::reporter::{CorpusReporter, NullReporter};
use crate::process::{BoundedCommand, ProcessOutcome, run_bounded};

/// Per-script timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a script did not pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NonZeroExit,
    Timeout,
    ProcessError,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::NonZeroExit => "non_zero_exit",
            FailureReason::Timeout => "timeout",
            FailureReason::ProcessError => "process_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running one corpus file.
///
/// A result is passed exactly when it has no failure reason; the constructors
/// are the only way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    filename: String,
    duration_seconds: f64,
    /// stdout when passed, stderr (or a failure description) otherwise
    captured_output: String,
    failure_reason: Option<FailureReason>,
    exit_code: Option<i32>,
}

impl TestResult {
    pub fn pass(filename: impl Into<String>, duration: Duration, stdout: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            duration_seconds: duration.as_secs_f64(),
            captured_output: stdout.into(),
            failure_reason: None,
            exit_code: Some(0),
        }
    }

    pub fn fail(
        filename: impl Into<String>,
        duration: Duration,
        reason: FailureReason,
        output: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            filename: filename.into(),
            duration_seconds: duration.as_secs_f64(),
            captured_output: output.into(),
            failure_reason: Some(reason),
            exit_code,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn passed(&self) -> bool {
        self.failure_reason.is_none()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn captured_output(&self) -> &str {
        &self.captured_output
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure_reason
    }

    /// Exit code of the script's process, when it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

/// Aggregate over the results of one corpus run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    results: Vec<TestResult>,
}

impl RunSummary {
    pub fn from_results(results: Vec<TestResult>) -> Self {
        Self { results }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Sum of per-file durations
    pub fn duration_seconds(&self) -> f64 {
        self.results.iter().map(TestResult::duration_seconds).sum()
    }
}

/// Conditions that prevent a corpus run from starting
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("interpreter binary not found at {}", .path.display())]
    MissingBinary { path: PathBuf },

    #[error("cannot read corpus directory '{}': {source}", .path.display())]
    CorpusUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// List files directly under `corpus_dir` whose name ends with `extension`,
/// sorted by file name. Subdirectories are not searched.
pub fn discover_corpus(corpus_dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(corpus_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(extension));
        if matches {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Run every corpus file against `binary`, reporting progress to `reporter`.
#[tracing::instrument(skip(reporter), fields(binary = %binary.display(), corpus = %corpus_dir.display()))]
pub fn run_corpus(
    binary: &Path,
    corpus_dir: &Path,
    extension: &str,
    timeout: Duration,
    reporter: &mut dyn CorpusReporter,
) -> Result<RunSummary, CorpusError> {
    if !binary.exists() {
        return Err(CorpusError::MissingBinary {
            path: binary.to_path_buf(),
        });
    }

    let files = discover_corpus(corpus_dir, extension).map_err(|source| CorpusError::CorpusUnreadable {
        path: corpus_dir.to_path_buf(),
        source,
    })?;

    tracing::info!(files = files.len(), "corpus discovered");
    reporter.on_discovered(corpus_dir, extension, files.len());

    let mut results = Vec::with_capacity(files.len());
    for file in &files {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());

        reporter.on_file_start(&filename);
        let result = run_file(binary, file, &filename, timeout);
        if let Some(reason) = result.failure_reason() {
            tracing::warn!(file = %filename, %reason, "corpus file failed");
        }
        reporter.on_file_complete(&result);
        results.push(result);
    }

    let summary = RunSummary::from_results(results);
    reporter.on_run_complete(&summary);
    Ok(summary)
}

/// [`run_corpus`] without progress output
pub fn run_corpus_quiet(
    binary: &Path,
    corpus_dir: &Path,
    extension: &str,
    timeout: Duration,
) -> Result<RunSummary, CorpusError> {
    run_corpus(binary, corpus_dir, extension, timeout, &mut NullReporter)
}

fn run_file(binary: &Path, script: &Path, filename: &str, timeout: Duration) -> TestResult {
    let start = Instant::now();
    let command = BoundedCommand::new(binary).arg(script).timeout(Some(timeout));

    match run_bounded(&command) {
        ProcessOutcome::Completed(done) if done.success() => TestResult::pass(filename, done.elapsed, done.stdout),
        ProcessOutcome::Completed(done) => TestResult::fail(
            filename,
            done.elapsed,
            FailureReason::NonZeroExit,
            done.stderr,
            done.exit_code,
        ),
        ProcessOutcome::TimedOut { elapsed, stderr, .. } => TestResult::fail(
            filename,
            elapsed,
            FailureReason::Timeout,
            timeout_message(timeout, &stderr),
            None,
        ),
        ProcessOutcome::SpawnFailed { message } => {
            TestResult::fail(filename, start.elapsed(), FailureReason::ProcessError, message, None)
        }
    }
}

fn timeout_message(timeout: Duration, stderr: &str) -> String {
    let mut msg = format!("timed out after {:.2}s", timeout.as_secs_f64());
    if !stderr.trim().is_empty() {
        msg.push('\n');
        msg.push_str(stderr);
    }
    msg
}
