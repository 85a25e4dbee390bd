//! CLI module for the harness
//!
//! ## Commands
//!
//! - `build` - Configure and compile the interpreter with a performance preset
//! - `examples` - Run the example corpus against a built interpreter
//! - `bench` - Run one benchmark under several runtimes and compare times
//! - `verify` - `build`, then `examples` against the fresh binary
//!
//! ## Exit codes
//!
//! - `0` - everything passed
//! - `1` - a build step, corpus file or benchmark comparison failed
//! - `2` - precondition failure (missing binary, unreadable corpus, bad arguments)
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::bench::BenchmarkSpec;
use crate::build::{BuildFlag, EnginePreset};
use crate::version::HARNESS_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    pub const PRECONDITION: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a precondition error (exit code 2).
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::PRECONDITION)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build, example-corpus and benchmark harness for the Axeon/KIO interpreters
#[derive(Parser, Debug)]
#[command(name = "axeon-harness")]
#[command(version = HARNESS_VERSION)]
#[command(about = "Build, test and benchmark the Axeon/KIO interpreters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure and compile the interpreter with all performance flags
    Build(BuildArgs),

    /// Run every example script against the interpreter binary
    Examples(ExamplesArgs),

    /// Run a benchmark under several runtimes and compare reported times
    Bench(BenchArgs),

    /// Build the interpreter, then run the examples against it
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Interpreter variant (selects option prefix and JIT default)
    #[arg(long, value_enum, default_value_t = EnginePreset::Axeon)]
    pub engine: EnginePreset,
    /// Interpreter source checkout (where the CMake project lives)
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub source_dir: PathBuf,
    /// Build output directory (created if missing, never cleaned)
    #[arg(long, value_name = "DIR", default_value = "build")]
    pub build_dir: PathBuf,
    /// Force the JIT on
    #[arg(long, conflicts_with = "no_jit")]
    pub jit: bool,
    /// Force the JIT off
    #[arg(long)]
    pub no_jit: bool,
    /// Also build the language server
    #[arg(long)]
    pub lsp: bool,
    /// Extra configure definition, appended after the preset
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = BuildFlag::parse_define)]
    pub defines: Vec<BuildFlag>,
    /// Configure tool
    #[arg(long, value_name = "PROGRAM", default_value = "cmake")]
    pub configure_tool: PathBuf,
    /// Compile tool (receives -j<N>)
    #[arg(long, value_name = "PROGRAM", default_value = "make")]
    pub compile_tool: PathBuf,
    /// Parallel compile jobs (default: number of CPUs)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,
}

impl BuildArgs {
    /// `Some` when --jit/--no-jit overrides the preset
    pub fn jit_override(&self) -> Option<bool> {
        match (self.jit, self.no_jit) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One line per file and a summary line
    #[default]
    Console,
    /// A single JSON document
    Json,
}

/// Options shared by `examples` and `verify`
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Directory of example scripts (not searched recursively)
    #[arg(long = "dir", value_name = "DIR", env = "HARNESS_CORPUS_DIR", default_value = "examples")]
    pub corpus_dir: PathBuf,
    /// Per-script timeout in seconds
    #[arg(long, value_name = "SECS", env = "HARNESS_TIMEOUT", default_value = "5", value_parser = parse_timeout)]
    pub timeout: Duration,
    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,
    /// Also print stdout of passing scripts
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExamplesArgs {
    /// Interpreter variant; picks the default binary and script extension
    #[arg(long, value_enum, default_value_t = EnginePreset::Axeon)]
    pub engine: EnginePreset,
    /// Interpreter binary (default: build/<engine binary>, where `build` puts it)
    #[arg(long, value_name = "PATH", env = "HARNESS_BINARY")]
    pub binary: Option<PathBuf>,
    /// Script file extension (default: the engine's)
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: Option<String>,
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

impl ExamplesArgs {
    pub fn binary_path(&self) -> PathBuf {
        self.binary
            .clone()
            .unwrap_or_else(|| PathBuf::from("build").join(self.engine.binary_name()))
    }

    pub fn script_extension(&self) -> &str {
        self.extension
            .as_deref()
            .unwrap_or_else(|| self.engine.script_extension())
    }
}

#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Runtime to benchmark (repeatable); the first two that report a time are compared
    #[arg(long = "spec", value_name = "LABEL=COMMAND", value_parser = BenchmarkSpec::parse)]
    pub specs: Vec<BenchmarkSpec>,
    /// Use wall-clock time for LABEL when it prints no metric line (repeatable)
    #[arg(long = "fallback", value_name = "LABEL")]
    pub fallback: Vec<String>,
    /// Per-runtime timeout in seconds (default: none)
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub build: BuildArgs,
    /// Script file extension (default: the engine's)
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: Option<String>,
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

/// Parse a timeout in (fractional) seconds
pub fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    if secs <= 0.0 {
        return Err(format!("timeout must be positive, got {}", secs));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout '{}': {}", raw, e))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Build(args) => commands::build(&args),
        Command::Examples(args) => commands::run_examples(&args.binary_path(), args.script_extension(), &args.corpus),
        Command::Bench(args) => commands::compare_benchmarks(&args),
        Command::Verify(args) => commands::verify(&args),
    }
}

// ============================================================================
// Tests
// ============================================================================
