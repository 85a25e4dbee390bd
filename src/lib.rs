#![forbid(unsafe_code)]
//! Axeon/KIO interpreter harness
//!
//! Builds the interpreter with its performance flags, runs the example corpus
//! against the built binary, and compares benchmark times across runtimes.
//! The interpreter itself (and node, java, ...) are external programs; this
//! crate only starts them, bounds them, and reads their output.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod bench;
pub mod build;
pub mod cli;
pub mod corpus;
pub mod process;
pub mod version;

pub use bench::{BenchmarkComparator, BenchmarkRun, BenchmarkSample, BenchmarkSpec, ComparisonReport, parse_metric};
pub use build::{BuildConfig, BuildError, BuildFlag, BuildOrchestrator, EnginePreset};
pub use corpus::{CorpusError, FailureReason, RunSummary, TestResult, run_corpus, run_corpus_quiet};
pub use process::{BoundedCommand, CompletedProcess, ProcessOutcome, run_bounded};
