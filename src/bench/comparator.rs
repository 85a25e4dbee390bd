//! Cross-runtime benchmark comparison
//!
//! Each runtime runs its version of the benchmark once, sequentially, and is
//! expected to print a metric line (see [`super::metric`]). A runtime that
//! fails or reports nothing yields an absent sample; the others still run.
//!
//! ## Wall-clock fallback
//!
//! Measuring the harness's own view of elapsed time is only done for specs that
//! opt in with `wall_clock_fallback`, for runtimes that don't self-report at
//! all. For every other spec a missing metric line is an extraction failure.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::metric::parse_metric;
use super::reporter::BenchReporter;
use crate::process::{BoundedCommand, ProcessOutcome, run_bounded};

/// One runtime's benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSpec {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Use harness-measured elapsed time when no metric line is printed
    pub wall_clock_fallback: bool,
    /// Overrides the comparator's timeout for this runtime
    pub timeout: Option<Duration>,
}

impl BenchmarkSpec {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            wall_clock_fallback: false,
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wall_clock_fallback(mut self, enabled: bool) -> Self {
        self.wall_clock_fallback = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse `label=program arg...`. The command is split on whitespace.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let Some((label, command)) = raw.split_once('=') else {
            return Err(format!("expected LABEL=COMMAND, got '{}'", raw));
        };
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("missing runtime label in '{}'", raw));
        }

        let mut words = command.split_whitespace();
        let Some(program) = words.next() else {
            return Err(format!("missing command for runtime '{}'", label));
        };
        Ok(BenchmarkSpec::new(label, program).with_args(words))
    }

    /// Axeon against Node.js, the pair the benchmark scripts were written for
    pub fn default_pair() -> Vec<BenchmarkSpec> {
        vec![
            BenchmarkSpec::new("axeon", "./dist/axeon").with_args(["scripts/bench_axeon.axe"]),
            BenchmarkSpec::new("node", "node").with_args(["scripts/bench_js.js"]),
        ]
    }

    pub fn command(&self) -> BoundedCommand {
        BoundedCommand::new(&self.program).args(&self.args)
    }
}

/// Where a sample's time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// Parsed from the program's metric line
    Reported,
    /// Measured by the harness (opt-in fallback)
    WallClock,
}

/// Why a sample has no time
#[derive(Debug, Clone, PartialEq)]
pub enum SampleFailure {
    NonZeroExit { exit_code: Option<i32>, stderr: String },
    TimedOut,
    SpawnFailed(String),
    /// The run succeeded but printed no usable metric line
    MetricMissing,
}

impl fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFailure::NonZeroExit {
                exit_code: Some(code), ..
            } => write!(f, "exited with code {}", code),
            SampleFailure::NonZeroExit { exit_code: None, .. } => write!(f, "terminated by signal"),
            SampleFailure::TimedOut => write!(f, "timed out"),
            SampleFailure::SpawnFailed(msg) => write!(f, "{}", msg),
            SampleFailure::MetricMissing => write!(f, "no 'Time (ms):' line in output"),
        }
    }
}

/// One runtime's measured (or missing) time.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSample {
    runtime_label: String,
    time_ms: Option<f64>,
    source: Option<MetricSource>,
    failure: Option<SampleFailure>,
    stdout: String,
}

impl BenchmarkSample {
    pub fn measured(label: impl Into<String>, time_ms: f64, source: MetricSource, stdout: impl Into<String>) -> Self {
        Self {
            runtime_label: label.into(),
            time_ms: Some(time_ms),
            source: Some(source),
            failure: None,
            stdout: stdout.into(),
        }
    }

    pub fn failed(label: impl Into<String>, failure: SampleFailure, stdout: impl Into<String>) -> Self {
        Self {
            runtime_label: label.into(),
            time_ms: None,
            source: None,
            failure: Some(failure),
            stdout: stdout.into(),
        }
    }

    pub fn runtime_label(&self) -> &str {
        &self.runtime_label
    }

    pub fn time_ms(&self) -> Option<f64> {
        self.time_ms
    }

    pub fn source(&self) -> Option<MetricSource> {
        self.source
    }

    pub fn failure(&self) -> Option<&SampleFailure> {
        self.failure.as_ref()
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }
}

/// Relative speed of the subject against the reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// Subject is N times faster
    Faster(f64),
    /// Subject is N times slower (or equal, N = 1)
    Slower(f64),
}

/// Pairwise ratio between two present samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub subject: String,
    pub reference: String,
    pub subject_ms: f64,
    pub reference_ms: f64,
    /// subject time / reference time
    pub ratio: f64,
    pub verdict: Verdict,
}

impl ComparisonReport {
    /// `None` unless both samples have a usable time.
    pub fn between(subject: &BenchmarkSample, reference: &BenchmarkSample) -> Option<Self> {
        let subject_ms = subject.time_ms()?;
        let reference_ms = reference.time_ms()?;
        let ratio = time_ratio(subject_ms, reference_ms)?;
        let verdict = if ratio < 1.0 {
            Verdict::Faster(1.0 / ratio)
        } else {
            Verdict::Slower(ratio)
        };

        Some(Self {
            subject: subject.runtime_label().to_string(),
            reference: reference.runtime_label().to_string(),
            subject_ms,
            reference_ms,
            ratio,
            verdict,
        })
    }

    /// `axeon is 2.15x faster than node`
    pub fn summary(&self) -> String {
        match self.verdict {
            Verdict::Faster(n) => format!("{} is {:.2}x faster than {}", self.subject, n, self.reference),
            Verdict::Slower(n) => format!("{} is {:.2}x slower than {}", self.subject, n, self.reference),
        }
    }
}

/// `a / b`, or `None` when either time can't take part in a ratio.
pub fn time_ratio(a: f64, b: f64) -> Option<f64> {
    let usable = |t: f64| t.is_finite() && t > 0.0;
    (usable(a) && usable(b)).then(|| a / b)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Complete(ComparisonReport),
    Incomplete { reason: String },
}

/// Samples in spec order, plus the comparison of the first two that have a time
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
    samples: Vec<BenchmarkSample>,
    comparison: Comparison,
}

impl BenchmarkRun {
    pub fn samples(&self) -> &[BenchmarkSample] {
        &self.samples
    }

    /// Sample for `label` (first one, if labels repeat)
    pub fn sample(&self, label: &str) -> Option<&BenchmarkSample> {
        self.samples.iter().find(|s| s.runtime_label() == label)
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    pub fn report(&self) -> Option<&ComparisonReport> {
        match &self.comparison {
            Comparison::Complete(report) => Some(report),
            Comparison::Incomplete { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.comparison, Comparison::Complete(_))
    }
}

/// Runs benchmark specs and compares their reported times.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkComparator {
    timeout: Option<Duration>,
}

impl BenchmarkComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every run without its own timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every spec in order and compare the first two runtimes that reported a time.
    #[tracing::instrument(skip_all, fields(specs = specs.len()))]
    pub fn compare(&self, specs: &[BenchmarkSpec], reporter: &mut dyn BenchReporter) -> BenchmarkRun {
        let mut samples = Vec::with_capacity(specs.len());
        for spec in specs {
            reporter.on_spec_start(spec);
            let sample = self.sample(spec);
            if let Some(failure) = sample.failure() {
                tracing::warn!(runtime = %spec.label, %failure, "benchmark produced no time");
            }
            reporter.on_sample(&sample);
            samples.push(sample);
        }

        let comparison = compare_first_two(&samples);
        let run = BenchmarkRun { samples, comparison };
        reporter.on_complete(&run);
        run
    }

    fn sample(&self, spec: &BenchmarkSpec) -> BenchmarkSample {
        tracing::info!(runtime = %spec.label, command = %spec.command().display(), "running benchmark");
        let command = spec.command().timeout(spec.timeout.or(self.timeout));

        match run_bounded(&command) {
            ProcessOutcome::Completed(done) if done.success() => match parse_metric(&done.stdout) {
                Some(ms) => BenchmarkSample::measured(&spec.label, ms, MetricSource::Reported, done.stdout),
                None if spec.wall_clock_fallback => {
                    let ms = done.elapsed.as_secs_f64() * 1000.0;
                    BenchmarkSample::measured(&spec.label, ms, MetricSource::WallClock, done.stdout)
                }
                None => BenchmarkSample::failed(&spec.label, SampleFailure::MetricMissing, done.stdout),
            },
            ProcessOutcome::Completed(done) => BenchmarkSample::failed(
                &spec.label,
                SampleFailure::NonZeroExit {
                    exit_code: done.exit_code,
                    stderr: done.stderr,
                },
                done.stdout,
            ),
            ProcessOutcome::TimedOut { stdout, .. } => {
                BenchmarkSample::failed(&spec.label, SampleFailure::TimedOut, stdout)
            }
            ProcessOutcome::SpawnFailed { message } => {
                BenchmarkSample::failed(&spec.label, SampleFailure::SpawnFailed(message), "")
            }
        }
    }
}

/// Compare the first two samples that have a time, in spec order.
fn compare_first_two(samples: &[BenchmarkSample]) -> Comparison {
    if samples.len() < 2 {
        return Comparison::Incomplete {
            reason: "at least two runtimes are needed for a comparison".to_string(),
        };
    }

    let mut timed = samples.iter().filter(|s| s.time_ms().is_some());
    let (Some(subject), Some(reference)) = (timed.next(), timed.next()) else {
        let failures: Vec<String> = samples
            .iter()
            .filter_map(|s| s.failure().map(|f| format!("'{}': {}", s.runtime_label(), f)))
            .collect();
        return Comparison::Incomplete {
            reason: format!("fewer than two runtimes reported a time (no time for {})", failures.join(", ")),
        };
    };

    match ComparisonReport::between(subject, reference) {
        Some(report) => Comparison::Complete(report),
        None => Comparison::Incomplete {
            reason: format!(
                "times for '{}' and '{}' are not comparable",
                subject.runtime_label(),
                reference.runtime_label()
            ),
        },
    }
}
