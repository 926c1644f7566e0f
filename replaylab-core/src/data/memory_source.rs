//! In-process market source.
//!
//! Serves candles from memory, computes indicators on the fly from those
//! candles and returns pre-registered algorithm result sets. Every upstream
//! call is counted, which is what tests use to observe caching and
//! coalescing. Optional latency and failure injection make slow or broken
//! upstreams reproducible.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::DataError;
use super::lock;
use super::request::{Payload, Request, RequestKind};
use super::source::MarketSource;
use super::synthetic::synthetic_candles;
use crate::domain::{
    block_start, AssetIdentifier, AssetInfo, Candle, CandleSet, Exchange, ExchangeList,
    Indicator, IndicatorMeta, Series, SeriesValue, CANDLE_SET_SIZE,
};
use crate::indicators;
use crate::results::ScenarioResultSet;

struct SymbolData {
    symbol: AssetIdentifier,
    resolution: i64,
    candles: BTreeMap<i64, Candle>,
}

impl SymbolData {
    fn on_board_date(&self) -> i64 {
        self.candles
            .values()
            .find(|c| !c.missing)
            .or_else(|| self.candles.values().next())
            .map(|c| c.time)
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct MemorySource {
    symbols: BTreeMap<String, SymbolData>,
    algorithms: HashMap<String, Arc<ScenarioResultSet>>,
    latency: Option<Duration>,
    candle_fetches: AtomicUsize,
    indicator_fetches: AtomicUsize,
    algorithm_fetches: AtomicUsize,
    exchange_fetches: AtomicUsize,
    failures: Mutex<HashMap<RequestKind, DataError>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source with seeded random-walk candles for every symbol over `[start, end)`.
    pub fn synthetic(symbols: &[AssetIdentifier], resolution: i64, start: i64, end: i64) -> Self {
        symbols.iter().fold(Self::new(), |src, symbol| {
            let candles = synthetic_candles(symbol, resolution, start, end);
            src.with_candles(symbol.clone(), resolution, candles)
        })
    }

    /// Register `candles` for `symbol`. Candles are placed by their `time`;
    /// slots without a candle read as missing.
    pub fn with_candles(
        mut self,
        symbol: AssetIdentifier,
        resolution: i64,
        candles: impl IntoIterator<Item = Candle>,
    ) -> Self {
        let data = self
            .symbols
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolData {
                symbol,
                resolution,
                candles: BTreeMap::new(),
            });
        data.candles.extend(candles.into_iter().map(|c| (c.time, c)));
        self
    }

    /// Register the result set served for one algorithm request.
    pub fn with_algorithm(
        mut self,
        symbol: AssetIdentifier,
        resolution: i64,
        name: impl Into<String>,
        result: ScenarioResultSet,
    ) -> Self {
        let request = Request::Algorithm {
            symbol,
            resolution,
            name: name.into(),
            params: result.parameters.clone(),
        };
        self.algorithms.insert(request.path(), Arc::new(result));
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent fetch of `kind` fail with `error`.
    pub fn fail_requests(&self, kind: RequestKind, error: DataError) {
        lock(&self.failures).insert(kind, error);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Upstream calls made for `kind` so far.
    pub fn fetches(&self, kind: RequestKind) -> usize {
        self.counter(kind).load(Ordering::SeqCst)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches(RequestKind::Candles)
            + self.fetches(RequestKind::Indicator)
            + self.fetches(RequestKind::Algorithm)
    }

    pub fn exchange_fetches(&self) -> usize {
        self.exchange_fetches.load(Ordering::SeqCst)
    }

    fn counter(&self, kind: RequestKind) -> &AtomicUsize {
        match kind {
            RequestKind::Candles => &self.candle_fetches,
            RequestKind::Indicator => &self.indicator_fetches,
            RequestKind::Algorithm => &self.algorithm_fetches,
        }
    }

    /// The series for `symbol` if it is served at `interval`.
    fn series(&self, symbol: &AssetIdentifier, interval: i64) -> Option<&SymbolData> {
        self.symbols
            .get(&symbol.to_string())
            .filter(|d| d.resolution == interval)
    }

    fn candle_set(&self, data: &SymbolData, block: i64) -> CandleSet {
        let start = block_start(block, data.resolution);
        let candles = (0..CANDLE_SET_SIZE as i64)
            .map(|i| {
                let time = start + i * data.resolution;
                data.candles
                    .get(&time)
                    .copied()
                    .unwrap_or_else(|| Candle::missing_at(time))
            })
            .collect();
        CandleSet {
            block,
            start,
            resolution: data.resolution,
            interval: data.resolution,
            candles,
        }
    }

    fn indicator(
        &self,
        data: &SymbolData,
        block: i64,
        name: &str,
        params: &[i64],
    ) -> Option<Indicator> {
        let start = block_start(block, data.resolution);
        let end = block_start(block + 1, data.resolution);

        // Full history up to the block end, so warmup carries across blocks.
        let history: Vec<&Candle> = data
            .candles
            .range(..end)
            .map(|(_, c)| c)
            .filter(|c| !c.missing)
            .collect();
        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        let outputs = indicators::compute(name, params, &closes)?;

        let series = outputs
            .into_iter()
            .map(|(key, values)| {
                let mut slots = vec![
                    SeriesValue {
                        value: 0.0,
                        missing: true,
                    };
                    CANDLE_SET_SIZE
                ];
                for (candle, value) in history.iter().zip(values) {
                    if candle.time < start || value.is_nan() {
                        continue;
                    }
                    let slot = ((candle.time - start) / data.resolution) as usize;
                    slots[slot] = SeriesValue {
                        value,
                        missing: false,
                    };
                }
                (key, Series { values: slots })
            })
            .collect();

        Some(Indicator {
            meta: IndicatorMeta {
                name: name.to_string(),
                base_interval: data.resolution,
                parameters: params.to_vec(),
            },
            series,
        })
    }
}

impl MarketSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, request: &Request) -> Result<Option<Payload>, DataError> {
        self.counter(request.kind()).fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if let Some(err) = lock(&self.failures).get(&request.kind()) {
            return Err(err.clone());
        }

        let payload = match request {
            Request::Candles {
                symbol,
                block,
                interval,
                ..
            } => self
                .series(symbol, *interval)
                .map(|d| Payload::Candles(Arc::new(self.candle_set(d, *block)))),
            Request::Indicator {
                symbol,
                block,
                interval,
                name,
                params,
                ..
            } => self
                .series(symbol, *interval)
                .and_then(|d| self.indicator(d, *block, name, params))
                .map(|i| Payload::Indicator(Arc::new(i))),
            Request::Algorithm { .. } => self
                .algorithms
                .get(&request.path())
                .map(|r| Payload::Algorithm(Arc::clone(r))),
        };
        Ok(payload)
    }

    fn exchange_info(&self) -> Result<ExchangeList, DataError> {
        self.exchange_fetches.fetch_add(1, Ordering::SeqCst);

        let mut by_broker: BTreeMap<&str, Vec<AssetInfo>> = BTreeMap::new();
        for (canonical, data) in &self.symbols {
            by_broker
                .entry(data.symbol.broker.as_str())
                .or_default()
                .push(AssetInfo {
                    symbol: canonical.clone(),
                    name: data.symbol.ticker.clone(),
                    on_board_date: data.on_board_date(),
                });
        }
        Ok(ExchangeList {
            exchanges: by_broker
                .into_iter()
                .map(|(broker, symbols)| Exchange {
                    broker_id: broker.to_string(),
                    symbols,
                })
                .collect(),
        })
    }
}
