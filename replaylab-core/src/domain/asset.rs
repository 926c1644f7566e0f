//! Asset identity — the (broker, market, ticker) triple.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies one tradable symbol at one broker.
///
/// The canonical string form `BROKER:MARKET:TICKER` is used as the cache key
/// component and as the key of the symbol map in the result tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetIdentifier {
    pub broker: String,
    pub market: String,
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed symbol '{input}': expected BROKER:MARKET:TICKER")]
pub struct AssetParseError {
    pub input: String,
}

impl AssetIdentifier {
    pub fn new(
        broker: impl Into<String>,
        market: impl Into<String>,
        ticker: impl Into<String>,
    ) -> Self {
        Self {
            broker: broker.into(),
            market: market.into(),
            ticker: ticker.into(),
        }
    }

    /// Parse the canonical form. A single trailing colon is tolerated.
    pub fn parse(input: &str) -> Result<Self, AssetParseError> {
        let err = || AssetParseError {
            input: input.to_string(),
        };
        let trimmed = input.strip_suffix(':').unwrap_or(input);
        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [broker, market, ticker]
                if !broker.is_empty() && !market.is_empty() && !ticker.is_empty() =>
            {
                Ok(Self::new(*broker, *market, *ticker))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for AssetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.broker, self.market, self.ticker)
    }
}

impl FromStr for AssetIdentifier {
    type Err = AssetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
