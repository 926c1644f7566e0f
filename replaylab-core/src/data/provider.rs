//! Per-(symbol, resolution) entry point into the market data.

use std::sync::Arc;

use super::algorithms::AlgorithmStore;
use super::error::DataError;
use super::market::MarketData;
use super::store::DataStore;
use crate::domain::{block_of, AssetIdentifier, AssetInfo};

/// Hands out block-scoped [`DataStore`]s and the symbol's [`AlgorithmStore`].
pub struct Provider {
    market: Arc<MarketData>,
    symbol: AssetIdentifier,
    resolution: i64,
    algorithms: Arc<AlgorithmStore>,
}

impl Provider {
    pub fn new(market: Arc<MarketData>, symbol: AssetIdentifier, resolution: i64) -> Self {
        let algorithms = Arc::new(AlgorithmStore::new(
            Arc::clone(&market),
            symbol.clone(),
            resolution,
        ));
        Self {
            market,
            symbol,
            resolution,
            algorithms,
        }
    }

    pub fn symbol(&self) -> &AssetIdentifier {
        &self.symbol
    }

    pub fn resolution(&self) -> i64 {
        self.resolution
    }

    /// Exchange metadata for this symbol: the broker must list it.
    pub fn info(&self) -> Result<AssetInfo, DataError> {
        let exchanges = self.market.exchange_info()?;
        exchanges
            .find(&self.symbol.broker, &self.symbol.to_string())
            .cloned()
            .ok_or_else(|| DataError::UnknownAsset {
                symbol: self.symbol.to_string(),
            })
    }

    /// Block holding the symbol's first data point.
    pub fn first_block(&self, info: &AssetInfo) -> i64 {
        self.block_of(info.on_board_date)
    }

    pub fn block_of(&self, ts: i64) -> i64 {
        block_of(ts, self.resolution)
    }

    pub fn data_store(&self, block: i64) -> DataStore {
        DataStore::new(
            Arc::clone(&self.market),
            self.symbol.clone(),
            self.resolution,
            block,
        )
    }

    pub fn algorithms(&self) -> &Arc<AlgorithmStore> {
        &self.algorithms
    }
}
