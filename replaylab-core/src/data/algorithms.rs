//! Memo of other algorithms' result sets for one (symbol, resolution).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::error::DataError;
use super::lock;
use super::market::MarketData;
use super::request::Request;
use crate::domain::AssetIdentifier;
use crate::results::ScenarioResultSet;

type Bucket = Arc<Mutex<Vec<Arc<ScenarioResultSet>>>>;

pub struct AlgorithmStore {
    market: Arc<MarketData>,
    symbol: AssetIdentifier,
    resolution: i64,
    by_name: Mutex<HashMap<String, Bucket>>,
}

impl AlgorithmStore {
    pub fn new(market: Arc<MarketData>, symbol: AssetIdentifier, resolution: i64) -> Self {
        Self {
            market,
            symbol,
            resolution,
            by_name: Mutex::new(HashMap::new()),
        }
    }

    /// Result set of algorithm `name` run with exactly `params`.
    ///
    /// # Panics
    /// If the upstream answers with a different number of parameters than
    /// were asked for.
    pub fn result_set(&self, name: &str, params: &[f64]) -> Result<Arc<ScenarioResultSet>, DataError> {
        let bucket = Arc::clone(lock(&self.by_name).entry(name.to_string()).or_default());
        let mut entries = lock(&bucket);

        if let Some(found) = entries.iter().find(|r| r.parameters == params) {
            return Ok(Arc::clone(found));
        }

        let result = self
            .market
            .algorithm(&self.symbol, self.resolution, name, params)?
            .ok_or_else(|| {
                DataError::not_found(
                    Request::Algorithm {
                        symbol: self.symbol.clone(),
                        resolution: self.resolution,
                        name: name.to_string(),
                        params: params.to_vec(),
                    }
                    .to_string(),
                )
            })?;
        assert_eq!(
            result.parameters.len(),
            params.len(),
            "algorithm \"{name}\" answered with the wrong parameter count"
        );
        entries.push(Arc::clone(&result));
        Ok(result)
    }
}
