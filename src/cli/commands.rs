//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;

use crate::bench::{BenchmarkComparator, BenchmarkSpec, ConsoleBenchReporter};
use crate::build::{BuildError, BuildOrchestrator, BuildSuccess};
use crate::corpus::{ConsoleReporter, CorpusError, CorpusReporter, JsonReporter, run_corpus};

use super::{BenchArgs, BuildArgs, CliError, CliResult, CorpusArgs, ExitCode, ReportFormat, VerifyArgs};

// ============================================================================
// Build
// ============================================================================

/// Configure and compile the interpreter.
pub fn build(args: &BuildArgs) -> CliResult<ExitCode> {
    build_interpreter(args)?;
    Ok(ExitCode::SUCCESS)
}

fn build_interpreter(args: &BuildArgs) -> CliResult<BuildSuccess> {
    let preset = args.engine;
    let config = preset
        .performance_config(args.jit_override(), args.lsp)
        .extended(args.defines.iter().cloned());

    let orchestrator = BuildOrchestrator::new(&args.source_dir, &args.build_dir)
        .with_configure_tool(&args.configure_tool)
        .with_compile_tool(&args.compile_tool)
        .with_jobs(args.jobs)
        .with_binary_name(preset.binary_name());

    println!("🔥 Building {} in {}...", preset, args.build_dir.display());
    for flag in config.flags() {
        tracing::debug!(%flag, "configure flag");
    }

    let success = orchestrator.build(&config).map_err(build_error)?;

    println!("🚀 Success! {} is ready ({} jobs).", preset, success.jobs);
    println!("Binary: {}", success.binary_path.display());
    Ok(success)
}

/// Render a build failure with its diagnostic and captured stderr.
fn build_error(err: BuildError) -> CliError {
    let mut message = String::new();
    if let Some(stderr) = err.captured_stderr() {
        message.push_str(stderr.trim_end());
        message.push('\n');
    }
    message.push_str(&format!("{:?}", miette::Report::new(err)));
    CliError::failure(message.trim_end())
}

// ============================================================================
// Example corpus
// ============================================================================

/// Run the example corpus against `binary`.
pub fn run_examples(binary: &Path, extension: &str, args: &CorpusArgs) -> CliResult<ExitCode> {
    let mut reporter: Box<dyn CorpusReporter> = match args.format {
        ReportFormat::Console => Box::new(ConsoleReporter::new(args.verbose)),
        ReportFormat::Json => Box::new(JsonReporter),
    };

    // Every CorpusError is a precondition failure: nothing was executed
    let summary = run_corpus(binary, &args.corpus_dir, extension, args.timeout, reporter.as_mut())
        .map_err(|e: CorpusError| CliError::precondition(format!("Error: {}", e)))?;

    if summary.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// Build, then run the corpus against the freshly built binary.
pub fn verify(args: &VerifyArgs) -> CliResult<ExitCode> {
    let success = build_interpreter(&args.build)?;
    let extension = args
        .extension
        .as_deref()
        .unwrap_or_else(|| args.build.engine.script_extension());
    run_examples(&success.binary_path, extension, &args.corpus)
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Run the benchmark specs and compare the first two that report a time.
pub fn compare_benchmarks(args: &BenchArgs) -> CliResult<ExitCode> {
    let specs = resolve_specs(args)?;

    let comparator = BenchmarkComparator::new().with_timeout(args.timeout);
    let run = comparator.compare(&specs, &mut ConsoleBenchReporter);

    if run.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// Specs from the command line (or the default pair) with fallbacks applied.
fn resolve_specs(args: &BenchArgs) -> CliResult<Vec<BenchmarkSpec>> {
    let mut specs = if args.specs.is_empty() {
        BenchmarkSpec::default_pair()
    } else {
        args.specs.clone()
    };

    for label in &args.fallback {
        let mut matched = false;
        for spec in specs.iter_mut().filter(|s| &s.label == label) {
            spec.wall_clock_fallback = true;
            matched = true;
        }
        if !matched {
            return Err(CliError::precondition(format!(
                "Error: --fallback '{}' does not name a benchmark runtime",
                label
            )));
        }
    }

    Ok(specs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bench_args(specs: &[&str], fallback: &[&str]) -> BenchArgs {
        BenchArgs {
            specs: specs.iter().map(|s| BenchmarkSpec::parse(s).unwrap()).collect(),
            fallback: fallback.iter().map(|s| s.to_string()).collect(),
            timeout: None,
        }
    }

    #[test]
    fn test_resolve_specs_defaults_to_pair() {
        let specs = resolve_specs(&bench_args(&[], &[])).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().all(|s| !s.wall_clock_fallback));
    }

    #[test]
    fn test_fallback_is_opt_in_per_runtime() {
        let specs = resolve_specs(&bench_args(&["a=a.sh", "b=b.sh"], &["b"])).unwrap();
        assert!(!specs[0].wall_clock_fallback);
        assert!(specs[1].wall_clock_fallback);
    }

    #[test]
    fn test_unknown_fallback_label_is_precondition_error() {
        let err = resolve_specs(&bench_args(&["a=a.sh"], &["zzz"])).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::PRECONDITION);
    }

    #[test]
    fn test_missing_binary_exits_with_precondition_code() {
        let args = CorpusArgs {
            corpus_dir: "examples".into(),
            timeout: std::time::Duration::from_secs(5),
            format: ReportFormat::Console,
            verbose: false,
        };
        let err = run_examples(Path::new("/nonexistent/build/kio"), ".kio", &args).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::PRECONDITION);
        assert!(err.message.contains("/nonexistent/build/kio"));
    }

    #[cfg(unix)]
    fn corpus_args(dir: &Path) -> CorpusArgs {
        CorpusArgs {
            corpus_dir: dir.to_path_buf(),
            timeout: std::time::Duration::from_secs(5),
            format: ReportFormat::Console,
            verbose: false,
        }
    }

    #[cfg(unix)]
    fn corpus_with(name: &str, scripts: &[(&str, &str)]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("axeon_harness_cli_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, body) in scripts {
            std::fs::write(dir.join(file), body).unwrap();
        }
        dir
    }

    #[cfg(unix)]
    #[test]
    fn test_passing_corpus_exits_with_success() {
        let dir = corpus_with("all_pass", &[("a.kio", "exit 0\n"), ("b.kio", "echo ok\n")]);
        let code = run_examples(Path::new("/bin/sh"), ".kio", &corpus_args(&dir)).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script_exits_with_failure_code() {
        let dir = corpus_with("one_fails", &[("a.kio", "exit 0\n"), ("b.kio", "exit 4\n")]);
        let err = run_examples(Path::new("/bin/sh"), ".kio", &corpus_args(&dir)).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    fn shell_spec(label: &str, script: &str) -> BenchmarkSpec {
        BenchmarkSpec::new(label, "/bin/sh").with_args(["-c", script])
    }

    #[cfg(unix)]
    #[test]
    fn test_complete_comparison_exits_with_success() {
        let args = BenchArgs {
            specs: vec![
                shell_spec("axeon", "echo 'Time (ms): 24.8'"),
                shell_spec("node", "echo 'Time (ms): 53.3'"),
            ],
            fallback: Vec::new(),
            timeout: None,
        };
        assert_eq!(compare_benchmarks(&args).unwrap(), ExitCode::SUCCESS);
    }

    #[cfg(unix)]
    #[test]
    fn test_incomplete_comparison_exits_with_failure_code() {
        let args = BenchArgs {
            specs: vec![
                shell_spec("axeon", "echo 'Time (ms): 24.8'"),
                shell_spec("node", "echo 'no metric here'"),
            ],
            fallback: Vec::new(),
            timeout: None,
        };
        let err = compare_benchmarks(&args).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }
}
