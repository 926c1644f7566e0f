//! Indicator values at the current slot.

use std::sync::Arc;

use crate::domain::Indicator;

pub struct IndicatorSupplier {
    indicator: Arc<Indicator>,
    index: usize,
}

impl IndicatorSupplier {
    pub(crate) fn new(indicator: Arc<Indicator>, index: usize) -> Self {
        Self { indicator, index }
    }

    /// Value of the primary series.
    pub fn value(&self) -> f64 {
        self.series(&self.indicator.meta.name)
    }

    /// Value of sub-series `key`.
    ///
    /// # Panics
    /// If the indicator has no such series.
    pub fn series(&self, key: &str) -> f64 {
        match self.indicator.series.get(key) {
            Some(series) => series.values[self.index].value,
            None => panic!(
                "indicator \"{}\" has no series \"{key}\"",
                self.indicator.meta.name
            ),
        }
    }

    /// Value of sub-series `key`, or `None` if the series is unknown or has
    /// no value at this slot.
    pub fn try_series(&self, key: &str) -> Option<f64> {
        self.indicator
            .series
            .get(key)
            .map(|s| s.values[self.index])
            .filter(|v| !v.missing)
            .map(|v| v.value)
    }

    /// True when every sub-series has a value at this slot.
    pub fn exists(&self) -> bool {
        self.indicator
            .series
            .values()
            .all(|s| !s.values[self.index].missing)
    }

    pub fn indicator(&self) -> &Indicator {
        &self.indicator
    }
}
