//! Candle — the fundamental market data unit — and the per-block CandleSet.

use serde::{Deserialize, Serialize};

/// Number of resolution slots in one block.
pub const CANDLE_SET_SIZE: usize = 5000;

pub const INTERVAL_1M: i64 = 60;
pub const INTERVAL_1H: i64 = 3_600;
pub const INTERVAL_1D: i64 = 86_400;

/// Time span in seconds covered by one block at `resolution`.
pub fn block_span(resolution: i64) -> i64 {
    resolution * CANDLE_SET_SIZE as i64
}

/// Block index containing timestamp `ts`.
pub fn block_of(ts: i64, resolution: i64) -> i64 {
    ts.div_euclid(block_span(resolution))
}

/// First timestamp of `block`.
pub fn block_start(block: i64, resolution: i64) -> i64 {
    block * block_span(resolution)
}

/// OHLCV candle for one time unit.
///
/// A candle with `missing == true` marks a slot where the market was closed
/// or no data exists; its prices carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub missing: bool,
}

impl Candle {
    /// A placeholder for a slot without data.
    pub fn missing_at(time: i64) -> Self {
        Self {
            time,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0.0,
            missing: true,
        }
    }
}

/// All candles of one block at one interval.
///
/// Slots are aligned to the resolution grid: slot `i` starts at
/// `start + i * resolution`, whatever the candle interval is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSet {
    pub block: i64,
    pub start: i64,
    pub resolution: i64,
    pub interval: i64,
    pub candles: Vec<Candle>,
}

impl CandleSet {
    /// Slot index of `ts` relative to this set (may fall outside `0..len`).
    pub fn index_of(&self, ts: i64) -> i64 {
        (ts - self.start).div_euclid(self.resolution)
    }

    /// Timestamp of slot `index`.
    pub fn time_at(&self, index: i64) -> i64 {
        self.start + index * self.resolution
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}
