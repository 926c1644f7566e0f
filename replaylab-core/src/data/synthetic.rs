//! Deterministic synthetic candles for offline runs and tests.

use chrono::{DateTime, Datelike, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{AssetIdentifier, Candle};

/// Random-walk candles on the `resolution` grid covering `[start, end)`.
///
/// The walk is seeded from the symbol, so the same symbol always yields the
/// same prices. Weekend slots are emitted as missing candles.
pub fn synthetic_candles(
    symbol: &AssetIdentifier,
    resolution: i64,
    start: i64,
    end: i64,
) -> Vec<Candle> {
    let seed: [u8; 32] = *blake3::hash(symbol.to_string().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut candles = Vec::new();
    let mut price = 100.0_f64;
    let mut time = start.div_euclid(resolution) * resolution;

    while time < end {
        if is_weekend(time) {
            candles.push(Candle::missing_at(time));
            time += resolution;
            continue;
        }

        let step_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + step_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        candles.push(Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
            missing: false,
        });

        price = close;
        time += resolution;
    }

    candles
}

fn is_weekend(ts: i64) -> bool {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| matches!(dt.weekday(), Weekday::Sat | Weekday::Sun))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::INTERVAL_1D;

    fn spy() -> AssetIdentifier {
        AssetIdentifier::new("UNICORN", "US", "SPY")
    }

    #[test]
    fn same_symbol_same_prices() {
        let a = synthetic_candles(&spy(), INTERVAL_1D, 0, 30 * INTERVAL_1D);
        let b = synthetic_candles(&spy(), INTERVAL_1D, 0, 30 * INTERVAL_1D);
        assert_eq!(a, b);
        let other = synthetic_candles(
            &AssetIdentifier::new("UNICORN", "US", "QQQ"),
            INTERVAL_1D,
            0,
            30 * INTERVAL_1D,
        );
        assert_ne!(a, other);
    }

    #[test]
    fn weekends_are_missing_and_grid_is_aligned() {
        // 1970-01-01 was a Thursday; days 2 and 3 are the weekend.
        let candles = synthetic_candles(&spy(), INTERVAL_1D, 0, 7 * INTERVAL_1D);
        assert_eq!(candles.len(), 7);
        assert!(!candles[1].missing);
        assert!(candles[2].missing);
        assert!(candles[3].missing);
        assert!(!candles[4].missing);
        for (i, c) in candles.iter().enumerate() {
            assert_eq!(c.time, i as i64 * INTERVAL_1D);
        }
    }

    #[test]
    fn ohlc_is_consistent() {
        for c in synthetic_candles(&spy(), INTERVAL_1D, 0, 200 * INTERVAL_1D) {
            if c.missing {
                continue;
            }
            assert!(c.high >= c.open.max(c.close));
            assert!(c.low <= c.open.min(c.close));
            assert!(c.volume > 0.0);
        }
    }
}
