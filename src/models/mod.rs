//! Forecasting models and the common forecast shape they produce

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

pub mod seasonal_arima;
pub mod seasonal_ets;

/// A prediction interval at one confidence level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionInterval {
    /// Confidence level as a percentage (e.g. 80, 95)
    pub level: u8,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

/// One forecasted day: point prediction plus intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    /// Date this step predicts
    pub date: NaiveDate,
    /// Point prediction
    pub point: f64,
    /// Intervals, one per requested confidence level
    pub intervals: Vec<PredictionInterval>,
}

impl ForecastStep {
    /// The interval at a given confidence level, if present
    pub fn interval(&self, level: u8) -> Option<&PredictionInterval> {
        self.intervals.iter().find(|i| i.level == level)
    }
}

/// A multi-day forecast with per-level prediction intervals.
///
/// Construction enforces the interval invariants: every interval contains
/// the point, and intervals widen monotonically with the confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    steps: Vec<ForecastStep>,
}

impl Forecast {
    /// Create a forecast, validating interval invariants on every step
    pub fn new(steps: Vec<ForecastStep>) -> Result<Self> {
        for step in &steps {
            if !step.point.is_finite() {
                return Err(ForecastError::ModelFit(format!(
                    "non-finite point forecast on {}",
                    step.date
                )));
            }

            for interval in &step.intervals {
                if !interval.lower.is_finite() || !interval.upper.is_finite() {
                    return Err(ForecastError::ModelFit(format!(
                        "non-finite interval bound at level {} on {}",
                        interval.level, step.date
                    )));
                }
                if interval.lower > step.point || step.point > interval.upper {
                    return Err(ForecastError::ModelFit(format!(
                        "interval at level {} does not contain the point forecast on {}",
                        interval.level, step.date
                    )));
                }
            }

            for a in &step.intervals {
                for b in &step.intervals {
                    if a.level < b.level && (a.lower < b.lower || a.upper > b.upper) {
                        return Err(ForecastError::ModelFit(format!(
                            "interval at level {} does not contain interval at level {} on {}",
                            b.level, a.level, step.date
                        )));
                    }
                }
            }
        }

        Ok(Self { steps })
    }

    /// Get the forecasted steps
    pub fn steps(&self) -> &[ForecastStep] {
        &self.steps
    }

    /// Number of horizon steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// A single step by zero-based index
    pub fn step(&self, idx: usize) -> Option<&ForecastStep> {
        self.steps.get(idx)
    }
}

/// A forecasting model: given a training window and a horizon, produce
/// point and interval predictions for the following calendar days.
pub trait Forecaster: Debug {
    /// Forecast `horizon` days past the end of the training window.
    ///
    /// `levels` are confidence percentages in ascending order. Fails with
    /// `InsufficientHistory` when the window is shorter than the model's
    /// minimum and with `ModelFit` when estimation does not converge.
    fn forecast(&self, train: &PriceSeries, horizon: usize, levels: &[u8]) -> Result<Forecast>;

    /// Minimum number of observations the model can be fit on
    fn min_observations(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Two-sided standard normal quantile for a confidence percentage
pub(crate) fn normal_quantile(level: u8) -> Result<f64> {
    if level == 0 || level >= 100 {
        return Err(ForecastError::InvalidParameter(format!(
            "confidence level must be between 1 and 99, got {}",
            level
        )));
    }

    let normal =
        Normal::new(0.0, 1.0).map_err(|e| ForecastError::ModelFit(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + f64::from(level) / 200.0))
}

/// Calendar dates for the `horizon` days following `last`
pub(crate) fn forecast_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last + Duration::days(offset))
        .collect()
}

/// Assemble forecast steps from point predictions and a residual scale.
///
/// Interval half-widths grow with the square root of the step; `sigma` is
/// floored at a hair above zero relative to `scale` so a noiseless fit still
/// yields valid intervals.
pub(crate) fn build_steps(
    last_date: NaiveDate,
    points: &[f64],
    sigma: f64,
    scale: f64,
    levels: &[u8],
) -> Result<Vec<ForecastStep>> {
    let sigma = sigma.max(scale.abs() * 1e-8);
    let dates = forecast_dates(last_date, points.len());

    let mut quantiles = Vec::with_capacity(levels.len());
    for &level in levels {
        quantiles.push((level, normal_quantile(level)?));
    }

    let steps = points
        .iter()
        .zip(dates)
        .enumerate()
        .map(|(h, (&point, date))| {
            let spread = sigma * ((h + 1) as f64).sqrt();
            let intervals = quantiles
                .iter()
                .map(|&(level, z)| PredictionInterval {
                    level,
                    lower: point - z * spread,
                    upper: point + z * spread,
                })
                .collect();

            ForecastStep {
                date,
                point,
                intervals,
            }
        })
        .collect();

    Ok(steps)
}
