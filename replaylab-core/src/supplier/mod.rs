//! The per-step view of market data handed to an algorithm.
//!
//! A [`DataSupplier`] is built for one slot of one block. Everything it
//! returns is "as of" that slot: candles at or before it, indicator values at
//! it, and other algorithms' events up to its end. Lookbacks may reach into
//! the previous block but never further.

pub mod composition;
pub mod indicator;

pub use composition::AlgorithmSupplier;
pub use indicator::IndicatorSupplier;

use crate::data::{AlgorithmStore, DataError, DataStore};
use crate::domain::{Candle, CANDLE_SET_SIZE};

pub struct DataSupplier<'a> {
    current: &'a DataStore,
    previous: &'a DataStore,
    algorithms: &'a AlgorithmStore,
    index: usize,
    time: i64,
    price: f64,
}

impl<'a> DataSupplier<'a> {
    /// Supplier for slot `index` of `current`; `time` and `price` are that
    /// slot's timestamp and close at the store's resolution.
    pub fn new(
        current: &'a DataStore,
        previous: &'a DataStore,
        algorithms: &'a AlgorithmStore,
        index: usize,
        time: i64,
        price: f64,
    ) -> Self {
        debug_assert!(index < CANDLE_SET_SIZE);
        Self {
            current,
            previous,
            algorithms,
            index,
            time,
            price,
        }
    }

    /// Close of the current candle at the run resolution.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Timestamp of the current slot.
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Slot index within the current block.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn resolution(&self) -> i64 {
        self.current.resolution()
    }

    /// Candles and indicators at `interval`.
    pub fn interval(&self, interval: i64) -> IntervalSupplier<'_> {
        IntervalSupplier {
            parent: self,
            interval,
        }
    }

    /// Events of algorithm `name` run with `params`, windowed to this step.
    pub fn algorithm(&self, name: &str, params: &[f64]) -> Result<AlgorithmSupplier, DataError> {
        let result = self.algorithms.result_set(name, params)?;
        Ok(AlgorithmSupplier::new(result, self.time, self.resolution()))
    }
}

pub struct IntervalSupplier<'s> {
    parent: &'s DataSupplier<'s>,
    interval: i64,
}

impl<'s> IntervalSupplier<'s> {
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// The candle at the current slot.
    pub fn candle(&self) -> Result<Candle, DataError> {
        self.from_last(0)
    }

    /// The candle `offset` slots before the current one.
    ///
    /// # Panics
    /// If `offset` reaches more than one block back.
    pub fn from_last(&self, offset: usize) -> Result<Candle, DataError> {
        assert!(
            offset <= CANDLE_SET_SIZE,
            "cannot retrieve candles more than 1 block back in time"
        );
        let (store, index) = if offset <= self.parent.index {
            (self.parent.current, self.parent.index - offset)
        } else {
            (
                self.parent.previous,
                self.parent.index + CANDLE_SET_SIZE - offset,
            )
        };
        let set = store.candles(self.interval)?;
        Ok(set.candles[index])
    }

    /// How many slots before the current one `ts` lies; negative for the future.
    pub fn to_offset(&self, ts: i64) -> i64 {
        let resolution = self.parent.resolution();
        (self.parent.time - resolution * ts.div_euclid(resolution)).div_euclid(resolution)
    }

    /// Timestamp of the slot `offset` steps back.
    ///
    /// # Panics
    /// If `offset` is negative.
    pub fn to_timestamp(&self, offset: i64) -> i64 {
        assert!(offset >= 0, "cannot look into the future");
        self.parent.time - offset * self.parent.resolution()
    }

    /// Indicator `name` with `params` at this interval.
    pub fn indicator(&self, name: &str, params: &[i64]) -> Result<IndicatorSupplier, DataError> {
        let indicator = self.parent.current.indicator(name, self.interval, params)?;
        Ok(IndicatorSupplier::new(indicator, self.parent.index))
    }
}
