//! Example corpus runner
//!
//! - `runner` - discovery, bounded execution and result aggregation
//! - `reporter` - console/JSON reporting of a run

pub mod reporter;
pub mod runner;

pub use reporter::{ConsoleReporter, CorpusReporter, JsonReporter, NullReporter};
pub use runner::{
    CorpusError, DEFAULT_TIMEOUT, FailureReason, RunSummary, TestResult, discover_corpus, run_corpus, run_corpus_quiet,
};
