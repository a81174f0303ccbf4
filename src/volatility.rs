//! Trailing volatility context for signal generation

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};

/// Fractional day-over-day returns of a price series
pub fn simple_returns(series: &PriceSeries) -> Vec<f64> {
    series
        .prices()
        .windows(2)
        .map(|w| (w[1] / w[0]) - 1.0)
        .collect()
}

/// Sample standard deviation of the most recent `window` daily returns.
///
/// This is the rolling-std volatility measure the signal layer normalizes
/// interval widths against; the value is a fraction (e.g. 0.05 for 5%).
pub fn trailing_volatility(series: &PriceSeries, window: usize) -> Result<f64> {
    if window < 2 {
        return Err(ForecastError::InvalidParameter(
            "volatility window must be at least 2".to_string(),
        ));
    }

    let returns = simple_returns(series);
    if returns.len() < window {
        return Err(ForecastError::Data(format!(
            "need at least {} observations for a {}-day volatility window, have {}",
            window + 1,
            window,
            series.len()
        )));
    }

    Ok(sample_std(&returns[returns.len() - window..]))
}

/// Rolling volatility over every full `window` of returns, oldest first
pub fn rolling_volatility(series: &PriceSeries, window: usize) -> Result<Vec<f64>> {
    if window < 2 {
        return Err(ForecastError::InvalidParameter(
            "volatility window must be at least 2".to_string(),
        ));
    }

    let returns = simple_returns(series);
    if returns.len() < window {
        return Err(ForecastError::Data(format!(
            "need at least {} observations for a {}-day volatility window, have {}",
            window + 1,
            window,
            series.len()
        )));
    }

    Ok(returns
        .windows(window)
        .map(sample_std)
        .collect())
}

/// Exponentially weighted volatility of a return series
pub fn ewma_volatility(returns: &[f64], lambda: f64) -> Result<Vec<f64>> {
    if lambda <= 0.0 || lambda >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "lambda must be between 0 and 1".to_string(),
        ));
    }

    if returns.is_empty() {
        return Ok(Vec::new());
    }

    let mut variance = vec![0.0; returns.len()];
    variance[0] = returns[0].powi(2);

    for i in 1..returns.len() {
        variance[i] = lambda * variance[i - 1] + (1.0 - lambda) * returns[i].powi(2);
    }

    Ok(variance.into_iter().map(f64::sqrt).collect())
}

fn sample_std(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
