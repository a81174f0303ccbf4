use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use forecast_backtest::{
    ewma_volatility, rolling_volatility, simple_returns, trailing_volatility, ForecastError,
    PricePoint, PriceSeries,
};

fn daily_series(prices: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            price,
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

#[test]
fn test_simple_returns() {
    let series = daily_series(&[100.0, 110.0, 99.0]);
    let returns = simple_returns(&series);

    assert_eq!(returns.len(), 2);
    assert_approx_eq!(returns[0], 0.1, 1e-12);
    assert_approx_eq!(returns[1], -0.1, 1e-12);
}

#[test]
fn test_trailing_volatility_known_value() {
    // returns are 0.1 and -0.1: mean 0, sample variance 0.02
    let series = daily_series(&[100.0, 110.0, 99.0]);
    let vol = trailing_volatility(&series, 2).unwrap();
    assert_approx_eq!(vol, 0.02_f64.sqrt(), 1e-12);
}

#[test]
fn test_trailing_volatility_constant_growth_is_zero() {
    // identical returns every day
    let series = daily_series(&[100.0, 110.0, 121.0, 133.1]);
    let vol = trailing_volatility(&series, 3).unwrap();
    assert_approx_eq!(vol, 0.0, 1e-12);
}

#[test]
fn test_trailing_volatility_errors() {
    let series = daily_series(&[100.0, 101.0, 102.0]);

    assert!(matches!(
        trailing_volatility(&series, 1),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        trailing_volatility(&series, 5),
        Err(ForecastError::Data(_))
    ));
}

#[test]
fn test_rolling_volatility_length() {
    let series = daily_series(&[100.0, 101.0, 103.0, 102.0, 105.0, 104.0]);
    let vols = rolling_volatility(&series, 3).unwrap();

    // 5 returns, 3-wide windows
    assert_eq!(vols.len(), 3);
    assert!(vols.iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn test_ewma_volatility() {
    let vols = ewma_volatility(&[0.02, -0.01, 0.03], 0.94).unwrap();

    assert_eq!(vols.len(), 3);
    assert_approx_eq!(vols[0], 0.02, 1e-12);
    assert!(vols.iter().all(|v| *v >= 0.0));

    assert!(ewma_volatility(&[], 0.94).unwrap().is_empty());
    assert!(matches!(
        ewma_volatility(&[0.01], 1.0),
        Err(ForecastError::InvalidParameter(_))
    ));
}
