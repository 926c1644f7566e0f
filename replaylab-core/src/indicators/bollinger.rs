//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! - middle: SMA(x, period)
//! - upper: middle + mult * stddev(x, period)
//! - lower: middle - mult * stddev(x, period)
//!
//! Uses population stddev (divide by N).

use super::sma::sma_of_series;

pub struct Bands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_of_series(values: &[f64], period: usize, multiplier: f64) -> Bands {
    let middle = sma_of_series(values, period);
    let n = values.len();
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];

    for i in 0..n {
        let mean = middle[i];
        if mean.is_nan() {
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let sd = variance.sqrt();
        upper[i] = mean + multiplier * sd;
        lower[i] = mean - multiplier * sd;
    }

    Bands {
        middle,
        upper,
        lower,
    }
}
