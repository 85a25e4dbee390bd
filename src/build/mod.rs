//! Interpreter build pipeline
//!
//! - `config` - ordered configure flags and engine presets
//! - `orchestrator` - fail-fast configure/compile driver

pub mod config;
pub mod orchestrator;

pub use config::{BuildConfig, BuildConfigBuilder, BuildFlag, EnginePreset, Toggle};
pub use orchestrator::{BuildError, BuildOrchestrator, BuildPhase, BuildSuccess, FALLBACK_JOBS, available_jobs};
