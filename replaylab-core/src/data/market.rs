//! The shared market-data context: source + cost cache + request coalescing.
//!
//! One `MarketData` is built per process (or per test) and shared by every
//! provider through an `Arc`. Lookups go cache → single-flight → source.
//! Confirmed absences are cached like payloads, at a nominal cost; errors are
//! never cached. Block payloads must hold exactly one block of slots or the
//! lookup fails with a decode error.

use std::sync::{Arc, Mutex};
use tracing::debug;

use super::cache::{CacheMode, CostCache, ABSENT_COST, PAYLOAD_COST};
use super::error::DataError;
use super::flight::SingleFlight;
use super::lock;
use super::request::{Payload, Request, RequestKind};
use super::source::MarketSource;
use crate::domain::{AssetIdentifier, CandleSet, ExchangeList, Indicator, CANDLE_SET_SIZE};
use crate::results::ScenarioResultSet;

type Outcome = Result<Option<Payload>, DataError>;

pub struct MarketData {
    source: Arc<dyn MarketSource>,
    mode: CacheMode,
    cache: CostCache<Option<Payload>>,
    flights: SingleFlight<Outcome>,
    exchanges: Mutex<Option<Arc<ExchangeList>>>,
}

impl MarketData {
    pub fn new(source: Arc<dyn MarketSource>, max_cost: u64, mode: CacheMode) -> Self {
        Self {
            source,
            mode,
            cache: CostCache::new(max_cost, mode),
            flights: SingleFlight::new(),
            exchanges: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn cache(&self) -> &CostCache<Option<Payload>> {
        &self.cache
    }

    pub fn source(&self) -> &dyn MarketSource {
        self.source.as_ref()
    }

    /// Resolve `request`, going upstream at most once per key at a time.
    pub fn fetch(&self, request: &Request) -> Outcome {
        let key = request.path();
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        self.flights.run(&key, || {
            // A previous leader may have filled the cache since our miss.
            if let Some(hit) = self.cache.get(&key) {
                return Ok(hit);
            }

            debug!(source = self.source.name(), key = %key, "upstream fetch");
            let payload = self.source.fetch(request)?;
            if let Some(p) = &payload {
                if p.kind() != request.kind() {
                    return Err(DataError::Decode {
                        url: key.clone(),
                        reason: format!(
                            "expected {:?} payload, got {:?}",
                            request.kind(),
                            p.kind()
                        ),
                    });
                }
                check_payload(&key, p)?;
            }

            let cost = if payload.is_some() {
                PAYLOAD_COST
            } else {
                debug!(key = %key, "caching absent marker");
                ABSENT_COST
            };
            self.cache.insert(key.clone(), payload.clone(), cost);
            Ok(payload)
        })
    }

    pub fn candles(
        &self,
        symbol: &AssetIdentifier,
        resolution: i64,
        block: i64,
        interval: i64,
    ) -> Result<Option<Arc<CandleSet>>, DataError> {
        let request = Request::Candles {
            symbol: symbol.clone(),
            resolution,
            block,
            interval,
        };
        match self.fetch(&request)? {
            Some(Payload::Candles(c)) => Ok(Some(c)),
            Some(other) => Err(kind_mismatch(&request, other.kind())),
            None => Ok(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn indicator(
        &self,
        symbol: &AssetIdentifier,
        resolution: i64,
        block: i64,
        interval: i64,
        name: &str,
        params: &[i64],
    ) -> Result<Option<Arc<Indicator>>, DataError> {
        let request = Request::Indicator {
            symbol: symbol.clone(),
            resolution,
            block,
            interval,
            name: name.to_string(),
            params: params.to_vec(),
        };
        match self.fetch(&request)? {
            Some(Payload::Indicator(i)) => Ok(Some(i)),
            Some(other) => Err(kind_mismatch(&request, other.kind())),
            None => Ok(None),
        }
    }

    pub fn algorithm(
        &self,
        symbol: &AssetIdentifier,
        resolution: i64,
        name: &str,
        params: &[f64],
    ) -> Result<Option<Arc<ScenarioResultSet>>, DataError> {
        let request = Request::Algorithm {
            symbol: symbol.clone(),
            resolution,
            name: name.to_string(),
            params: params.to_vec(),
        };
        match self.fetch(&request)? {
            Some(Payload::Algorithm(r)) => Ok(Some(r)),
            Some(other) => Err(kind_mismatch(&request, other.kind())),
            None => Ok(None),
        }
    }

    /// The exchange listing, fetched once and then served from memory.
    /// Failures are not remembered.
    pub fn exchange_info(&self) -> Result<Arc<ExchangeList>, DataError> {
        let mut memo = lock(&self.exchanges);
        if let Some(list) = memo.as_ref() {
            return Ok(Arc::clone(list));
        }
        debug!(source = self.source.name(), "fetching exchange info");
        let list = Arc::new(self.source.exchange_info()?);
        *memo = Some(Arc::clone(&list));
        Ok(list)
    }
}

/// Reject block payloads that do not cover exactly one block of slots.
fn check_payload(key: &str, payload: &Payload) -> Result<(), DataError> {
    let short = |what: &str, len: usize| DataError::Decode {
        url: key.to_string(),
        reason: format!("{what} has {len} slots, expected {CANDLE_SET_SIZE}"),
    };
    match payload {
        Payload::Candles(set) if set.candles.len() != CANDLE_SET_SIZE => {
            Err(short("candle set", set.candles.len()))
        }
        Payload::Indicator(indicator) => {
            for (name, series) in &indicator.series {
                if series.values.len() != CANDLE_SET_SIZE {
                    return Err(short(&format!("series {name:?}"), series.values.len()));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn kind_mismatch(request: &Request, got: RequestKind) -> DataError {
    DataError::Decode {
        url: request.path(),
        reason: format!("expected {:?} payload, got {got:?}", request.kind()),
    }
}
