//! Structured error types for market-data operations.

use thiserror::Error;

/// Lookup and transport failures of the market-data layer.
///
/// Cloneable so one coalesced upstream outcome can be handed to every caller
/// waiting on the same request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("{what} does not exist")]
    NotFound { what: String },

    #[error("could not find broker for asset: {symbol}")]
    UnknownAsset { symbol: String },

    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("request {url} failed with code {status}")]
    Status { url: String, status: u16 },

    #[error("decoding data from {url} failed: {reason}")]
    Decode { url: String, reason: String },
}

impl DataError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// True for the errors caused by the upstream being unreachable or broken,
    /// as opposed to a lookup of something that does not exist.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Status { .. } | Self::Decode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let e = DataError::not_found("indicator \"ema\"");
        assert_eq!(e.to_string(), "indicator \"ema\" does not exist");
        let e = DataError::Status {
            url: "http://x/market/info".into(),
            status: 500,
        };
        assert_eq!(e.to_string(), "request http://x/market/info failed with code 500");
    }

    #[test]
    fn transport_classification() {
        assert!(!DataError::not_found("x").is_transport());
        assert!(DataError::Decode {
            url: String::new(),
            reason: String::new()
        }
        .is_transport());
    }
}
