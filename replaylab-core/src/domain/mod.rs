//! Domain types: assets, candles, indicators, exchange metadata.

pub mod asset;
pub mod candle;
pub mod exchange;
pub mod indicator;

pub use asset::{AssetIdentifier, AssetParseError};
pub use candle::{
    block_of, block_span, block_start, Candle, CandleSet, CANDLE_SET_SIZE, INTERVAL_1D,
    INTERVAL_1H, INTERVAL_1M,
};
pub use exchange::{AssetInfo, Exchange, ExchangeList};
pub use indicator::{Indicator, IndicatorMeta, Series, SeriesValue};
