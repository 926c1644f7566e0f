//! Errors surfaced at the run boundary.

use thiserror::Error;

use replaylab_core::data::DataError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
