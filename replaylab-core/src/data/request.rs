//! Request descriptors and decoded payloads.
//!
//! A request's relative URL doubles as its canonical cache key: it names the
//! endpoint kind, the symbol, the resolution, the block or interval and every
//! parameter, so two requests share a key exactly when they ask for the same
//! data.

use std::fmt;
use std::sync::Arc;

use crate::domain::{AssetIdentifier, CandleSet, Indicator};
use crate::results::ScenarioResultSet;

/// Which upstream service answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Candles,
    Indicator,
    Algorithm,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Candles {
        symbol: AssetIdentifier,
        resolution: i64,
        block: i64,
        interval: i64,
    },
    Indicator {
        symbol: AssetIdentifier,
        resolution: i64,
        block: i64,
        interval: i64,
        name: String,
        params: Vec<i64>,
    },
    Algorithm {
        symbol: AssetIdentifier,
        resolution: i64,
        name: String,
        params: Vec<f64>,
    },
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Candles { .. } => RequestKind::Candles,
            Request::Indicator { .. } => RequestKind::Indicator,
            Request::Algorithm { .. } => RequestKind::Algorithm,
        }
    }

    pub fn symbol(&self) -> &AssetIdentifier {
        match self {
            Request::Candles { symbol, .. }
            | Request::Indicator { symbol, .. }
            | Request::Algorithm { symbol, .. } => symbol,
        }
    }

    /// Relative URL, also the cache key.
    pub fn path(&self) -> String {
        match self {
            Request::Candles {
                symbol,
                resolution,
                block,
                interval,
            } => format!(
                "market/t/{symbol}?segment={block}&interval={interval}&resolution={resolution}"
            ),
            Request::Indicator {
                symbol,
                resolution,
                block,
                interval,
                name,
                params,
            } => format!(
                "indicators/t/{name}?block={block}&interval={interval}&resolution={resolution}\
                 &symbol={symbol}&params={}",
                join_params(params)
            ),
            Request::Algorithm {
                symbol,
                resolution,
                name,
                params,
            } => format!(
                "sync/algorithms/{name}?resolution={resolution}&symbol={symbol}&params={}",
                join_params(params)
            ),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Candles {
                symbol,
                block,
                interval,
                ..
            } => write!(f, "{symbol} candles for block {block} ({interval})"),
            Request::Indicator { name, params, .. } => {
                write!(f, "indicator \"{name}\" ({})", join_params(params))
            }
            Request::Algorithm { name, params, .. } => {
                write!(f, "algorithm \"{name}\" ({})", join_params(params))
            }
        }
    }
}

/// Comma-joined parameters. Floats use the shortest round-trip form.
pub fn join_params<T: fmt::Display>(params: &[T]) -> String {
    params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// A decoded upstream response.
#[derive(Debug, Clone)]
pub enum Payload {
    Candles(Arc<CandleSet>),
    Indicator(Arc<Indicator>),
    Algorithm(Arc<ScenarioResultSet>),
}

impl Payload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Payload::Candles(_) => RequestKind::Candles,
            Payload::Indicator(_) => RequestKind::Indicator,
            Payload::Algorithm(_) => RequestKind::Algorithm,
        }
    }
}
