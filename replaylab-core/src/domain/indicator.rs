//! Indicator — a named, parameterized series computed upstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of an indicator request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMeta {
    pub name: String,
    pub base_interval: i64,
    pub parameters: Vec<i64>,
}

impl IndicatorMeta {
    /// Bucket key used by the block-level indicator memo.
    pub fn primary_parameter(params: &[i64]) -> i64 {
        params.first().copied().unwrap_or(0)
    }

    pub fn matches(&self, interval: i64, params: &[i64]) -> bool {
        self.base_interval == interval && self.parameters == params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesValue {
    pub value: f64,
    pub missing: bool,
}

/// One sub-series, aligned slot-for-slot to the block's CandleSet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub values: Vec<SeriesValue>,
}

/// An indicator over one block. The primary series is keyed by `meta.name`;
/// multi-output indicators (bands, MACD) carry extra named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub meta: IndicatorMeta,
    pub series: BTreeMap<String, Series>,
}

impl Indicator {
    pub fn primary(&self) -> Option<&Series> {
        self.series.get(&self.meta.name)
    }
}
