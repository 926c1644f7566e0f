//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

/// SMA over `values`. Any window containing a NaN yields NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let mut sum = 0.0;
    let mut nans = 0usize;
    for &v in values.iter().take(period) {
        if v.is_nan() {
            nans += 1;
        } else {
            sum += v;
        }
    }
    if nans == 0 {
        result[period - 1] = sum / period as f64;
    }

    for i in period..n {
        let leaving = values[i - period];
        let entering = values[i];
        if leaving.is_nan() {
            nans -= 1;
        } else {
            sum -= leaving;
        }
        if entering.is_nan() {
            nans += 1;
        } else {
            sum += entering;
        }
        if nans == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}
