//! Cross-runtime benchmark comparison
//!
//! - `metric` - `Time (ms):` metric line parser
//! - `comparator` - sequential runs, samples and the pairwise comparison
//! - `reporter` - console reporting

pub mod comparator;
pub mod metric;
pub mod reporter;

pub use comparator::{
    BenchmarkComparator, BenchmarkRun, BenchmarkSample, BenchmarkSpec, Comparison, ComparisonReport, MetricSource,
    SampleFailure, Verdict, time_ratio,
};
pub use metric::{METRIC_MARKER, parse_metric};
pub use reporter::{BenchReporter, ConsoleBenchReporter, NullBenchReporter};
