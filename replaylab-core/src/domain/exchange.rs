//! Exchange metadata: which symbols a broker lists and since when.

use serde::{Deserialize, Serialize};

/// Static information about one listed symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    /// Canonical `BROKER:MARKET:TICKER` form.
    pub symbol: String,
    pub name: String,
    /// Unix seconds of the first available data point.
    pub on_board_date: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub broker_id: String,
    pub symbols: Vec<AssetInfo>,
}

impl Exchange {
    pub fn symbol(&self, canonical: &str) -> Option<&AssetInfo> {
        self.symbols.iter().find(|s| s.symbol == canonical)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeList {
    pub exchanges: Vec<Exchange>,
}

impl ExchangeList {
    /// Find a symbol at the given broker.
    pub fn find(&self, broker: &str, canonical: &str) -> Option<&AssetInfo> {
        self.exchanges
            .iter()
            .filter(|e| e.broker_id == broker)
            .find_map(|e| e.symbol(canonical))
    }
}
