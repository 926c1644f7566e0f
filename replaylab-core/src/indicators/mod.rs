//! Series math for the indicators the in-process source computes.
//!
//! Each indicator maps a close series to one or more named output series of
//! the same length; NaN marks slots without a value (warmup or gaps). The
//! primary output is keyed by the indicator's own name.

pub mod bollinger;
pub mod ema;
pub mod sma;

pub use bollinger::{bollinger_of_series, Bands};
pub use ema::ema_of_series;
pub use sma::sma_of_series;

use std::collections::BTreeMap;

/// Names [`compute`] understands.
pub const SUPPORTED: &[&str] = &["ema", "sma", "bb"];

/// Compute indicator `name` over `closes`.
///
/// Returns `None` for unknown names or unusable parameters, which the caller
/// reports as a missing indicator.
pub fn compute(name: &str, params: &[i64], closes: &[f64]) -> Option<BTreeMap<String, Vec<f64>>> {
    let period = usize::try_from(*params.first()?).ok().filter(|&p| p >= 1)?;
    let mut out = BTreeMap::new();
    match name {
        "ema" => {
            out.insert(name.to_string(), ema_of_series(closes, period));
        }
        "sma" => {
            out.insert(name.to_string(), sma_of_series(closes, period));
        }
        "bb" => {
            let multiplier = params.get(1).copied().unwrap_or(2) as f64;
            let bands = bollinger_of_series(closes, period, multiplier);
            out.insert(name.to_string(), bands.middle);
            out.insert("upper".to_string(), bands.upper);
            out.insert("lower".to_string(), bands.lower);
        }
        _ => return None,
    }
    Some(out)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
