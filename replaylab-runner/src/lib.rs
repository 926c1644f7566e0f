//! ReplayLab Runner — replay orchestration on top of `replaylab-core`.
//!
//! This crate provides:
//! - Engine configuration (TOML, environment overrides) and run requests
//! - The `Algorithm` step-function contract
//! - The evaluator: validation, one task per symbol on a bounded pool,
//!   progress and run metrics
//! - A shutdown gate for in-flight runs
//! - Demonstration algorithms

pub mod algorithm;
pub mod config;
pub mod demos;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod task;

pub use algorithm::Algorithm;
pub use config::{CacheConfig, ConfigError, EngineConfig, RunRequest, RunSettings, SourcesConfig};
pub use error::RunError;
pub use evaluator::{EvalOptions, Evaluator, Metrics, RunState};
pub use gate::{RunGate, RunGuard};
pub use task::{progress_percent, Progress};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn evaluator_is_send_sync() {
        assert_send::<Evaluator<demos::EmaCross>>();
        assert_sync::<Evaluator<demos::EmaCross>>();
        assert_send::<Evaluator<demos::RollingHigh>>();
        assert_sync::<Evaluator<demos::RollingHigh>>();
    }

    #[test]
    fn run_types_are_send_sync() {
        assert_send::<RunGate>();
        assert_sync::<RunGate>();
        assert_send::<Progress>();
        assert_sync::<Progress>();
        assert_send::<Metrics>();
        assert_sync::<Metrics>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<EngineConfig>();
        assert_sync::<EngineConfig>();
        assert_send::<RunRequest>();
        assert_sync::<RunRequest>();
    }
}
