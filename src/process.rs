//! Bounded process execution
//!
//! Every external program the harness starts (configure/compile tools, the
//! interpreter under test, benchmark runtimes) goes through [`run_bounded`].
//!
//! ## Guarantees
//!
//! - stdout and stderr are captured separately, each drained on its own thread,
//!   so a child that fills one pipe never deadlocks against the other.
//! - With a timeout, the child is polled until it exits or the deadline passes.
//!   On expiry the child's whole process group is killed (unix) and the child is
//!   reaped before returning. When the child exits on its own, anything it left
//!   running in its group is killed too: nothing spawned by the harness outlives
//!   the call, and no descendant can hold the output pipes open.
//! - The working directory is set on the child only. The harness process never
//!   changes its own current directory.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a bounded child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A program invocation with an optional wall-clock bound.
#[derive(Debug, Clone)]
pub struct BoundedCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl BoundedCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the child in `dir` instead of the harness's working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Bound the run; `None` waits for the child indefinitely
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Human-readable command line, for logs and error messages
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// A child that ran to completion (successfully or not).
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedProcess {
    /// Exit code, `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CompletedProcess {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Result of a bounded run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed(CompletedProcess),
    /// The deadline passed; the child was killed and reaped.
    TimedOut {
        elapsed: Duration,
        stdout: String,
        stderr: String,
    },
    /// The child could not be started (or waited on).
    SpawnFailed { message: String },
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
}

/// Run `command` to completion, or until its timeout expires.
#[tracing::instrument(skip_all, fields(command = %command.display(), timeout = ?command.timeout))]
pub fn run_bounded(command: &BoundedCommand) -> ProcessOutcome {
    let start = Instant::now();

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &command.current_dir {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout can take down grandchildren too
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ProcessOutcome::SpawnFailed {
                message: format!("failed to start '{}': {}", command.display(), e),
            };
        }
    };

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let waited = wait_with_deadline(&mut child, command.timeout);
    if let Ok(Waited::Exited(_)) = waited {
        // Background descendants would keep the pipes open past the child's exit
        kill_leftovers(&child);
    }

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);
    let elapsed = start.elapsed();

    tracing::debug!(
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "child finished"
    );

    match waited {
        Ok(Waited::Exited(status)) => ProcessOutcome::Completed(CompletedProcess {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed,
        }),
        Ok(Waited::TimedOut) => ProcessOutcome::TimedOut {
            elapsed,
            stdout,
            stderr,
        },
        Err(e) => ProcessOutcome::SpawnFailed {
            message: format!("failed waiting on '{}': {}", command.display(), e),
        },
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Option<Duration>) -> io::Result<Waited> {
    let Some(deadline) = timeout.and_then(|t| Instant::now().checked_add(t)) else {
        return child.wait().map(Waited::Exited);
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Waited::Exited(status)),
            Ok(None) => {}
            Err(e) => {
                terminate(child);
                let _ = child.wait();
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            terminate(child);
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "failed to reap timed-out child");
            }
            return Ok(Waited::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the process group led by `child`.
#[cfg(unix)]
fn kill_group(child: &Child) -> Option<nix::Result<()>> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    i32::try_from(child.id())
        .ok()
        .map(|pid| killpg(Pid::from_raw(pid), Signal::SIGKILL))
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    match kill_group(child) {
        Some(Ok(())) => {}
        other => {
            tracing::debug!(result = ?other, "process group kill failed, killing child only");
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

/// Kill whatever the (already reaped) child left running in its group.
#[cfg(unix)]
fn kill_leftovers(child: &Child) {
    // ESRCH when the group is already empty
    if let Some(Ok(())) = kill_group(child) {
        tracing::debug!(pid = child.id(), "killed leftover descendants");
    }
}

#[cfg(not(unix))]
fn kill_leftovers(_child: &Child) {}

fn spawn_reader<R>(stream: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>>
where
    R: Read + Send + 'static,
{
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .and_then(Result::ok)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
