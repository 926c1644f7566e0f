//! Block-scoped memo of candle sets and indicators.
//!
//! A `DataStore` covers one block of one (symbol, resolution). Candle sets are
//! memoized per interval. Indicators are memoized in two levels: (name,
//! interval) selects a sub-store, the primary parameter selects a bucket, and
//! the bucket is scanned linearly for the exact parameter list. Each bucket has
//! its own lock held across fetch-and-insert, so lookups of different
//! indicators never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::DataError;
use super::lock;
use super::market::MarketData;
use super::request::Request;
use crate::domain::{AssetIdentifier, CandleSet, Indicator, IndicatorMeta};

type Bucket = Arc<Mutex<Vec<Arc<Indicator>>>>;

#[derive(Default)]
struct IndicatorSubStore {
    buckets: Mutex<HashMap<i64, Bucket>>,
}

impl IndicatorSubStore {
    fn bucket(&self, primary: i64) -> Bucket {
        Arc::clone(lock(&self.buckets).entry(primary).or_default())
    }
}

pub struct DataStore {
    market: Arc<MarketData>,
    symbol: AssetIdentifier,
    resolution: i64,
    block: i64,
    candles: Mutex<HashMap<i64, Arc<CandleSet>>>,
    indicators: Mutex<HashMap<(String, i64), Arc<IndicatorSubStore>>>,
}

impl DataStore {
    pub fn new(
        market: Arc<MarketData>,
        symbol: AssetIdentifier,
        resolution: i64,
        block: i64,
    ) -> Self {
        Self {
            market,
            symbol,
            resolution,
            block,
            candles: Mutex::new(HashMap::new()),
            indicators: Mutex::new(HashMap::new()),
        }
    }

    pub fn block(&self) -> i64 {
        self.block
    }

    pub fn resolution(&self) -> i64 {
        self.resolution
    }

    pub fn symbol(&self) -> &AssetIdentifier {
        &self.symbol
    }

    /// The block's candles at `interval`.
    pub fn candles(&self, interval: i64) -> Result<Arc<CandleSet>, DataError> {
        if let Some(set) = lock(&self.candles).get(&interval) {
            return Ok(Arc::clone(set));
        }

        let set = self
            .market
            .candles(&self.symbol, self.resolution, self.block, interval)?
            .ok_or_else(|| {
                DataError::not_found(
                    Request::Candles {
                        symbol: self.symbol.clone(),
                        resolution: self.resolution,
                        block: self.block,
                        interval,
                    }
                    .to_string(),
                )
            })?;

        Ok(Arc::clone(
            lock(&self.candles).entry(interval).or_insert(set),
        ))
    }

    /// The block's indicator `name` at `interval` with exactly `params`.
    ///
    /// # Panics
    /// If a bucket holds an indicator of another name or interval.
    pub fn indicator(
        &self,
        name: &str,
        interval: i64,
        params: &[i64],
    ) -> Result<Arc<Indicator>, DataError> {
        let sub = {
            let mut subs = lock(&self.indicators);
            Arc::clone(subs.entry((name.to_string(), interval)).or_default())
        };
        let bucket = sub.bucket(IndicatorMeta::primary_parameter(params));
        let mut entries = lock(&bucket);

        for indicator in entries.iter() {
            let meta = &indicator.meta;
            assert!(meta.name == name, "wrong indicator in sub-store: {}", meta.name);
            assert!(
                meta.base_interval == interval,
                "wrong interval in sub-store: {}",
                meta.base_interval
            );
            if meta.matches(interval, params) {
                return Ok(Arc::clone(indicator));
            }
        }

        let indicator = self
            .market
            .indicator(
                &self.symbol,
                self.resolution,
                self.block,
                interval,
                name,
                params,
            )?
            .ok_or_else(|| {
                DataError::not_found(
                    Request::Indicator {
                        symbol: self.symbol.clone(),
                        resolution: self.resolution,
                        block: self.block,
                        interval,
                        name: name.to_string(),
                        params: params.to_vec(),
                    }
                    .to_string(),
                )
            })?;
        entries.push(Arc::clone(&indicator));
        Ok(indicator)
    }

    /// Indicators memoized so far, across all buckets.
    pub fn indicator_count(&self) -> usize {
        let subs: Vec<_> = lock(&self.indicators).values().cloned().collect();
        subs.iter()
            .map(|sub| {
                let buckets: Vec<_> = lock(&sub.buckets).values().cloned().collect();
                buckets.iter().map(|b| lock(b).len()).sum::<usize>()
            })
            .sum()
    }
}
