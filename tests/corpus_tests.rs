//! Corpus runner tests against real processes
//!
//! `/bin/sh` stands in for the interpreter: it is invoked as `<binary> <script>`
//! exactly like the real one, so each corpus file is a small shell script.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use axeon_harness::corpus::{
    CorpusError, CorpusReporter, FailureReason, RunSummary, TestResult, discover_corpus, run_corpus, run_corpus_quiet,
};

const SH: &str = "/bin/sh";

/// Fresh, empty corpus directory unique to one test
fn corpus_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("axeon_harness_corpus_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

/// Whether `pid` is alive, waiting briefly for a pending SIGKILL to land.
/// Zombies awaiting their reaper count as dead.
fn still_running(pid: &str) -> bool {
    let stat = PathBuf::from(format!("/proc/{}/stat", pid));
    for _ in 0..100 {
        let alive = if Path::new("/proc/self/stat").exists() {
            fs::read_to_string(&stat)
                .ok()
                .and_then(|s| s.rsplit_once(')').map(|(_, rest)| rest.trim_start().to_string()))
                .is_some_and(|rest| !rest.starts_with('Z') && !rest.starts_with('X'))
        } else {
            Command::new(SH)
                .arg("-c")
                .arg(format!("kill -0 {} 2>/dev/null", pid))
                .status()
                .is_ok_and(|status| status.success())
        };
        if !alive {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    true
}

/// Counts reporter callbacks
#[derive(Default)]
struct CountingReporter {
    discovered: Option<usize>,
    started: Vec<String>,
    completed: usize,
    finished: bool,
}

impl CorpusReporter for CountingReporter {
    fn on_discovered(&mut self, _corpus_dir: &Path, _extension: &str, count: usize) {
        self.discovered = Some(count);
    }

    fn on_file_start(&mut self, filename: &str) {
        self.started.push(filename.to_string());
    }

    fn on_file_complete(&mut self, _result: &TestResult) {
        self.completed += 1;
    }

    fn on_run_complete(&mut self, _summary: &RunSummary) {
        self.finished = true;
    }
}

#[test]
fn test_passing_script_captures_stdout() {
    let dir = corpus_dir("pass");
    write_script(&dir, "ok.kio", "printf OK\n");

    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_secs(5)).unwrap();

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.passed(), 1);
    let result = &summary.results()[0];
    assert_eq!(result.filename(), "ok.kio");
    assert!(result.passed());
    assert_eq!(result.failure_reason(), None);
    assert_eq!(result.captured_output(), "OK");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_non_zero_exit_captures_stderr() {
    let dir = corpus_dir("fail");
    write_script(&dir, "boom.kio", "printf ignored\nprintf boom >&2\nexit 3\n");

    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_secs(5)).unwrap();

    let result = &summary.results()[0];
    assert!(!result.passed());
    assert_eq!(result.failure_reason(), Some(FailureReason::NonZeroExit));
    assert_eq!(result.captured_output(), "boom");
    assert_eq!(result.exit_code(), Some(3));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_timeout_kills_the_script() {
    let dir = corpus_dir("timeout");
    let pid_file = dir.join("pid");
    write_script(
        &dir,
        "hang.kio",
        &format!("echo $$ > '{}'\nexec sleep 30\n", pid_file.display()),
    );

    let start = Instant::now();
    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_millis(300)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(10));

    let result = &summary.results()[0];
    assert!(!result.passed());
    assert_eq!(result.failure_reason(), Some(FailureReason::Timeout));
    assert!(result.captured_output().starts_with("timed out after 0.30s"));

    let pid = fs::read_to_string(&pid_file).unwrap();
    assert!(!still_running(pid.trim()), "timed-out process {} is still running", pid.trim());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_background_process_is_killed_after_pass() {
    let dir = corpus_dir("background");
    let pid_file = dir.join("pid");
    write_script(
        &dir,
        "spawner.kio",
        &format!("sleep 30 &\necho $! > '{}'\nprintf OK\n", pid_file.display()),
    );

    let start = Instant::now();
    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_millis(500)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(3), "run took {:?}", start.elapsed());

    let result = &summary.results()[0];
    assert!(result.passed());
    assert_eq!(result.captured_output(), "OK");

    let pid = fs::read_to_string(&pid_file).unwrap();
    assert!(!still_running(pid.trim()), "background process {} outlived the run", pid.trim());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_non_executable_binary_is_process_error() {
    let dir = corpus_dir("noexec");
    let binary = dir.join("kio");
    fs::write(&binary, "not a program").unwrap();
    write_script(&dir, "a.kio", "exit 0\n");

    let summary = run_corpus_quiet(&binary, &dir, ".kio", Duration::from_secs(5)).unwrap();

    assert_eq!(summary.total(), 1);
    let result = &summary.results()[0];
    assert_eq!(result.failure_reason(), Some(FailureReason::ProcessError));
    assert!(!result.captured_output().is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_failures_do_not_stop_the_run() {
    let dir = corpus_dir("mixed");
    write_script(&dir, "01_fail.kio", "exit 1\n");
    write_script(&dir, "02_hang.kio", "exec sleep 30\n");
    write_script(&dir, "03_pass.kio", "echo fine\n");

    let mut reporter = CountingReporter::default();
    let summary = run_corpus(Path::new(SH), &dir, ".kio", Duration::from_millis(300), &mut reporter).unwrap();

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.passed(), 1);
    let reasons: Vec<_> = summary.results().iter().map(TestResult::failure_reason).collect();
    assert_eq!(
        reasons,
        vec![Some(FailureReason::NonZeroExit), Some(FailureReason::Timeout), None]
    );
    assert_eq!(reporter.discovered, Some(3));
    assert_eq!(reporter.started, vec!["01_fail.kio", "02_hang.kio", "03_pass.kio"]);
    assert_eq!(reporter.completed, 3);
    assert!(reporter.finished);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_discovery_filters_sorts_and_stays_flat() {
    let dir = corpus_dir("discovery");
    write_script(&dir, "b.kio", "exit 0\n");
    write_script(&dir, "a.kio", "exit 0\n");
    write_script(&dir, "c.kio", "exit 1\n");
    write_script(&dir, "notes.txt", "exit 1\n");
    write_script(&dir, "script.kio.bak", "exit 1\n");
    fs::create_dir_all(dir.join("nested.kio")).unwrap();
    write_script(&dir.join("nested.kio"), "deep.kio", "exit 1\n");

    let files = discover_corpus(&dir, ".kio").unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.kio", "b.kio", "c.kio"]);

    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_secs(5)).unwrap();
    assert_eq!(summary.total(), 3);
    assert_eq!(summary.passed(), 2);
    let order: Vec<_> = summary.results().iter().map(TestResult::filename).collect();
    assert_eq!(order, vec!["a.kio", "b.kio", "c.kio"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_empty_corpus_is_an_empty_summary() {
    let dir = corpus_dir("empty");
    let summary = run_corpus_quiet(Path::new(SH), &dir, ".kio", Duration::from_secs(5)).unwrap();
    assert_eq!(summary.total(), 0);
    assert_eq!(summary.passed(), 0);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_binary_attempts_nothing() {
    let dir = corpus_dir("missing_binary");
    write_script(&dir, "a.kio", "exit 0\n");

    let mut reporter = CountingReporter::default();
    let err = run_corpus(
        &dir.join("build/kio"),
        &dir,
        ".kio",
        Duration::from_secs(5),
        &mut reporter,
    )
    .unwrap_err();

    assert!(matches!(err, CorpusError::MissingBinary { .. }));
    assert_eq!(reporter.discovered, None);
    assert!(reporter.started.is_empty());
    assert!(!reporter.finished);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_corpus_dir_is_unreadable() {
    let err = run_corpus_quiet(
        Path::new(SH),
        Path::new("/nonexistent/axeon-examples"),
        ".kio",
        Duration::from_secs(5),
    )
    .unwrap_err();
    assert!(matches!(err, CorpusError::CorpusUnreadable { .. }));
}
