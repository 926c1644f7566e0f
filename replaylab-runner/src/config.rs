//! Engine configuration and run requests.
//!
//! `EngineConfig` is read from TOML; every field has a default, and the three
//! upstream URLs can be overridden from the environment (`KIO_URL`,
//! `INCA_URL`, `ALGO_URL`). A `RunRequest` describes one run and may be
//! written as JSON or TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use replaylab_core::data::{
    CacheMode, DataError, HttpSource, MarketData, MarketSource, SourceUrls, DEFAULT_MAX_COST,
};
use replaylab_core::domain::AssetParseError;
use replaylab_core::memory::ParameterError;

/// Invalid configuration: detected before any data is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no symbols given")]
    NoSymbols,

    #[error("resolution must be positive, got {0}")]
    BadResolution(i64),

    #[error(transparent)]
    Symbol(#[from] AssetParseError),

    #[error("scenario {index}: {source}")]
    Parameters {
        index: usize,
        #[source]
        source: ParameterError,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {origin}: {reason}")]
    Parse { origin: String, reason: String },
}

// ── Engine config ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub candles_url: String,
    pub indicators_url: String,
    pub algorithms_url: String,
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            candles_url: "http://localhost:8080".into(),
            indicators_url: "http://localhost:8081".into(),
            algorithms_url: "http://localhost:8082".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_cost: u64,
    pub mode: CacheMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MAX_COST,
            mode: CacheMode::Historical,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Worker threads; 0 means one per available core.
    pub max_threads: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub run: RunSettings,
}

impl EngineConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_toml(&content)?.with_env())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            origin: "engine TOML".into(),
            reason: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            origin: "engine TOML".into(),
            reason: e.to_string(),
        })
    }

    /// Apply `KIO_URL`, `INCA_URL` and `ALGO_URL` from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply URL overrides from `lookup`; empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = get("KIO_URL") {
            self.sources.candles_url = url;
        }
        if let Some(url) = get("INCA_URL") {
            self.sources.indicators_url = url;
        }
        if let Some(url) = get("ALGO_URL") {
            self.sources.algorithms_url = url;
        }
        self
    }

    pub fn source_urls(&self) -> SourceUrls {
        SourceUrls {
            candles: self.sources.candles_url.clone(),
            indicators: self.sources.indicators_url.clone(),
            algorithms: self.sources.algorithms_url.clone(),
        }
    }

    /// Effective worker count.
    pub fn max_threads(&self) -> usize {
        if self.run.max_threads > 0 {
            self.run.max_threads
        } else {
            default_threads()
        }
    }

    /// Market data backed by the configured HTTP services.
    pub fn http_market_data(&self) -> Result<Arc<MarketData>, DataError> {
        let source = HttpSource::new(
            self.source_urls(),
            Duration::from_secs(self.sources.timeout_secs),
            self.cache.mode,
        )?;
        Ok(self.market_data_with(Arc::new(source)))
    }

    /// Market data backed by an arbitrary source, with this config's cache settings.
    pub fn market_data_with(&self, source: Arc<dyn MarketSource>) -> Arc<MarketData> {
        Arc::new(MarketData::new(source, self.cache.max_cost, self.cache.mode))
    }
}

pub(crate) fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ── Run request ──────────────────────────────────────────────────────

/// One run: which symbols, which parameter combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub symbols: Vec<String>,
    pub scenarios: Vec<Vec<f64>>,
    pub resolution: i64,
    /// Parameter names; defaults to the algorithm's own keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    /// Last timestamp to replay (unix seconds); defaults to now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
}

impl RunRequest {
    /// Load from a `.toml` file, or JSON for any other extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();
        if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                origin,
                reason: e.to_string(),
            })
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                origin,
                reason: e.to_string(),
            })
        }
    }
}
