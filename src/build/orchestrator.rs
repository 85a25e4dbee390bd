//! Two-phase build driver (configure, then compile)
//!
//! The pipeline is fail-fast: a non-zero status from the configure step means
//! the compile step never runs. Failures are not retried; the same flags would
//! reproduce the same failure.

use std::fmt;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use miette::Diagnostic;
use thiserror::Error;

use super::config::BuildConfig;
use crate::process::{BoundedCommand, CompletedProcess, ProcessOutcome, run_bounded};

/// Parallelism used when the number of processing units can't be determined
pub const FALLBACK_JOBS: usize = 4;

/// Number of parallel compile jobs to request.
pub fn available_jobs() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_JOBS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Configure,
    Compile,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Configure => write!(f, "configure"),
            BuildPhase::Compile => write!(f, "compile"),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Anchor a relative tool path like `./scripts/cmake` to the harness's working
/// directory, since the tool itself runs inside the build directory. Bare names
/// (`cmake`) are left for the `PATH` lookup.
fn resolve_tool(tool: &Path) -> PathBuf {
    if tool.is_absolute() || tool.components().count() < 2 {
        return tool.to_path_buf();
    }
    std::path::absolute(tool).unwrap_or_else(|_| tool.to_path_buf())
}

/// Errors that abort the build pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("source directory '{}' is not accessible", .path.display())]
    #[diagnostic(code(harness::build::source_dir), help("pass the interpreter checkout with --source-dir"))]
    SourceDirUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create build directory '{}'", .path.display())]
    #[diagnostic(code(harness::build::build_dir))]
    BuildDirUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{phase} tool '{tool}' could not be run: {message}")]
    #[diagnostic(code(harness::build::tool), help("check that the tool is installed and on PATH"))]
    ToolUnavailable {
        phase: BuildPhase,
        tool: String,
        message: String,
    },

    #[error("configuration failed ({})", exit_label(.exit_code))]
    #[diagnostic(code(harness::build::configure), help("fix the configure error above; the compile step was not run"))]
    ConfigureFailed { exit_code: Option<i32>, stderr: String },

    #[error("compilation failed ({})", exit_label(.exit_code))]
    #[diagnostic(code(harness::build::compile))]
    CompileFailed { exit_code: Option<i32>, stderr: String },
}

impl BuildError {
    /// Stderr captured from the failing phase, if any
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            BuildError::ConfigureFailed { stderr, .. } | BuildError::CompileFailed { stderr, .. } => {
                Some(stderr.as_str()).filter(|s| !s.trim().is_empty())
            }
            _ => None,
        }
    }

    fn phase_failed(phase: BuildPhase, exit_code: Option<i32>, stderr: String) -> Self {
        match phase {
            BuildPhase::Configure => BuildError::ConfigureFailed { exit_code, stderr },
            BuildPhase::Compile => BuildError::CompileFailed { exit_code, stderr },
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSuccess {
    pub build_dir: PathBuf,
    pub jobs: usize,
    /// Where the interpreter executable is expected after the build
    pub binary_path: PathBuf,
}

/// Drives the external configure/compile pipeline.
#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    source_dir: PathBuf,
    build_dir: PathBuf,
    configure_tool: PathBuf,
    compile_tool: PathBuf,
    jobs: Option<usize>,
    binary_name: String,
}

impl BuildOrchestrator {
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            configure_tool: PathBuf::from("cmake"),
            compile_tool: PathBuf::from("make"),
            jobs: None,
            binary_name: "axeon".to_string(),
        }
    }

    pub fn with_configure_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.configure_tool = tool.into();
        self
    }

    pub fn with_compile_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.compile_tool = tool.into();
        self
    }

    /// Override the compile parallelism (defaults to [`available_jobs`])
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|&j| j > 0);
        self
    }

    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn binary_path(&self) -> PathBuf {
        self.build_dir.join(&self.binary_name)
    }

    /// Configure and compile with `config`.
    #[tracing::instrument(skip_all, fields(build_dir = %self.build_dir.display(), flags = config.flags().len()))]
    pub fn build(&self, config: &BuildConfig) -> Result<BuildSuccess, BuildError> {
        let source_dir = fs::canonicalize(&self.source_dir).map_err(|source| BuildError::SourceDirUnavailable {
            path: self.source_dir.clone(),
            source,
        })?;

        // Never wipes an existing build tree
        fs::create_dir_all(&self.build_dir).map_err(|source| BuildError::BuildDirUnavailable {
            path: self.build_dir.clone(),
            source,
        })?;

        let configure = BoundedCommand::new(resolve_tool(&self.configure_tool))
            .arg(&source_dir)
            .args(config.to_args())
            .current_dir(&self.build_dir);
        self.run_phase(BuildPhase::Configure, &configure)?;

        let jobs = self.jobs.unwrap_or_else(available_jobs);
        let compile = BoundedCommand::new(resolve_tool(&self.compile_tool))
            .arg(format!("-j{}", jobs))
            .current_dir(&self.build_dir);
        self.run_phase(BuildPhase::Compile, &compile)?;

        tracing::info!(jobs, "build finished");
        Ok(BuildSuccess {
            build_dir: self.build_dir.clone(),
            jobs,
            binary_path: self.binary_path(),
        })
    }

    fn run_phase(&self, phase: BuildPhase, command: &BoundedCommand) -> Result<CompletedProcess, BuildError> {
        tracing::info!(%phase, command = %command.display(), "starting build phase");

        match run_bounded(command) {
            ProcessOutcome::Completed(done) if done.success() => {
                tracing::debug!(%phase, stdout = %done.stdout, "build phase output");
                Ok(done)
            }
            ProcessOutcome::Completed(done) => {
                tracing::warn!(%phase, exit_code = ?done.exit_code, "build phase failed");
                Err(BuildError::phase_failed(phase, done.exit_code, done.stderr))
            }
            // Unreachable without a deadline
            ProcessOutcome::TimedOut { stderr, .. } => Err(BuildError::phase_failed(phase, None, stderr)),
            ProcessOutcome::SpawnFailed { message } => Err(BuildError::ToolUnavailable {
                phase,
                tool: command.program().display().to_string(),
                message,
            }),
        }
    }
}
