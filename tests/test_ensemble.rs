use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use forecast_backtest::{
    persistence_forecast, Forecast, ForecastEnsemble, ForecastError, ForecastStep, Forecaster,
    PredictionInterval, PricePoint, PriceSeries,
};

fn daily_series(prices: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let points = prices
        .iter()
        .enumerate()
        .map(|(i, &price)| PricePoint {
            date: start + Duration::days(i as i64),
            price,
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

/// Forecasts a fixed value with fixed-width intervals
#[derive(Debug)]
struct ConstantForecaster {
    name: String,
    value: f64,
}

impl ConstantForecaster {
    fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

impl Forecaster for ConstantForecaster {
    fn forecast(&self, train: &PriceSeries, horizon: usize, levels: &[u8]) -> Result<Forecast, ForecastError> {
        let last = train.last().date;
        let steps = (1..=horizon as i64)
            .map(|h| ForecastStep {
                date: last + Duration::days(h),
                point: self.value,
                intervals: levels
                    .iter()
                    .map(|&level| PredictionInterval {
                        level,
                        lower: self.value - f64::from(level) / 10.0,
                        upper: self.value + f64::from(level) / 10.0,
                    })
                    .collect(),
            })
            .collect();
        Forecast::new(steps)
    }

    fn min_observations(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Always fails to fit
#[derive(Debug)]
struct BrokenForecaster;

impl Forecaster for BrokenForecaster {
    fn forecast(&self, _: &PriceSeries, _: usize, _: &[u8]) -> Result<Forecast, ForecastError> {
        Err(ForecastError::ModelFit("deliberately broken".to_string()))
    }

    fn min_observations(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "Broken"
    }
}

#[test]
fn test_empty_ensemble_rejected() {
    assert!(matches!(
        ForecastEnsemble::new(vec![]),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_default_models() {
    let ensemble = ForecastEnsemble::with_default_models().unwrap();
    let names = ensemble.model_names();

    assert_eq!(names.len(), 2);
    assert!(names.iter().any(|n| n.contains("ARIMA")));
    assert!(names.iter().any(|n| n.contains("ETS")));
}

#[test]
fn test_equal_weight_average() {
    let ensemble = ForecastEnsemble::new(vec![
        Box::new(ConstantForecaster::new("ten", 10.0)),
        Box::new(ConstantForecaster::new("twenty", 20.0)),
    ])
    .unwrap();

    let train = daily_series(&[12.0, 14.0, 15.0]);
    let result = ensemble.forecast(&train, 2, &[80, 95]).unwrap();

    assert!(!result.degraded);
    assert!(result.reasons.is_empty());
    assert_eq!(result.forecast.len(), 2);

    for step in result.forecast.steps() {
        assert_approx_eq!(step.point, 15.0, 1e-12);

        // bounds average too
        let i80 = step.interval(80).unwrap();
        assert_approx_eq!(i80.lower, 15.0 - 8.0, 1e-12);
        assert_approx_eq!(i80.upper, 15.0 + 8.0, 1e-12);
    }
}

#[test]
fn test_failed_model_degrades_to_persistence() {
    let ensemble = ForecastEnsemble::new(vec![
        Box::new(ConstantForecaster::new("twenty", 20.0)),
        Box::new(BrokenForecaster),
    ])
    .unwrap();

    let train = daily_series(&[10.0, 10.0, 10.0, 10.0]);
    let result = ensemble.forecast(&train, 1, &[80]).unwrap();

    assert!(result.degraded);
    assert_eq!(result.reasons.len(), 1);
    assert!(result.reasons[0].contains("Broken"));
    assert!(result.reasons[0].contains("deliberately broken"));

    // persistence contributes the last price, so the mean is (20 + 10) / 2
    let step = result.forecast.step(0).unwrap();
    assert_approx_eq!(step.point, 15.0, 1e-6);
}

#[test]
fn test_all_models_failing_still_degrades() {
    // every constituent fails, but the persistence fallback keeps the
    // ensemble producing output
    let ensemble = ForecastEnsemble::new(vec![
        Box::new(BrokenForecaster),
        Box::new(BrokenForecaster),
    ])
    .unwrap();

    let train = daily_series(&[10.0, 11.0, 10.5, 11.5]);
    let result = ensemble.forecast(&train, 1, &[80, 95]).unwrap();

    assert!(result.degraded);
    assert_eq!(result.reasons.len(), 2);
    assert_approx_eq!(result.forecast.step(0).unwrap().point, 11.5, 1e-12);
}

#[test]
fn test_forecast_parameter_validation() {
    let ensemble = ForecastEnsemble::with_default_models().unwrap();
    let train = daily_series(&[10.0, 11.0, 12.0]);

    assert!(matches!(
        ensemble.forecast(&train, 0, &[80]),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        ensemble.forecast(&train, 1, &[]),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_persistence_forecast() {
    let train = daily_series(&[100.0, 102.0, 101.0, 103.0]);
    let forecast = persistence_forecast(&train, 3, &[80, 95]).unwrap();

    assert_eq!(forecast.len(), 3);
    for step in forecast.steps() {
        assert_eq!(step.point, 103.0);

        let i80 = step.interval(80).unwrap();
        let i95 = step.interval(95).unwrap();
        assert!(i80.lower < 103.0 && 103.0 < i80.upper);
        assert!(i95.lower < i80.lower && i80.upper < i95.upper);
    }

    // intervals widen with the horizon
    let w1 = {
        let i = forecast.step(0).unwrap().interval(80).unwrap();
        i.upper - i.lower
    };
    let w3 = {
        let i = forecast.step(2).unwrap().interval(80).unwrap();
        i.upper - i.lower
    };
    assert!(w3 > w1);
}
