//! Equal-weight ensemble of forecasting models with explicit degradation

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::models::seasonal_arima::SeasonalArima;
use crate::models::seasonal_ets::SeasonalEts;
use crate::models::{build_steps, Forecast, ForecastStep, Forecaster, PredictionInterval};
use tracing::warn;

/// Weekly seasonality for the default daily models
const DEFAULT_SEASON_LENGTH: usize = 7;

/// An ensemble forecast with degradation metadata.
///
/// `degraded` is true when at least one constituent model failed and its
/// contribution was replaced by a naive persistence forecast; `reasons`
/// records one entry per failed model. Degradation is metadata for the
/// caller, never an error.
#[derive(Debug, Clone)]
pub struct EnsembleForecast {
    /// The combined forecast
    pub forecast: Forecast,
    /// Whether any constituent model fell back to persistence
    pub degraded: bool,
    /// One reason string per failed constituent
    pub reasons: Vec<String>,
}

/// Combines independent forecasters by arithmetic mean of their point
/// predictions and interval bounds (equal weighting).
#[derive(Debug)]
pub struct ForecastEnsemble {
    forecasters: Vec<Box<dyn Forecaster>>,
}

impl ForecastEnsemble {
    /// Create an ensemble from a non-empty set of forecasters
    pub fn new(forecasters: Vec<Box<dyn Forecaster>>) -> Result<Self> {
        if forecasters.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "ensemble requires at least one forecaster".to_string(),
            ));
        }

        Ok(Self { forecasters })
    }

    /// The default weekly-seasonal ARIMA + ETS pairing
    pub fn with_default_models() -> Result<Self> {
        Self::new(vec![
            Box::new(SeasonalArima::new(DEFAULT_SEASON_LENGTH)?),
            Box::new(SeasonalEts::new(DEFAULT_SEASON_LENGTH)?),
        ])
    }

    /// Names of the registered forecasters
    pub fn model_names(&self) -> Vec<&str> {
        self.forecasters.iter().map(|f| f.name()).collect()
    }

    /// Forecast with every registered model and combine the results.
    ///
    /// A model that fails contributes a persistence forecast instead and the
    /// output is flagged degraded. The call itself fails only when no model
    /// contribution could be produced at all.
    pub fn forecast(
        &self,
        train: &PriceSeries,
        horizon: usize,
        levels: &[u8],
    ) -> Result<EnsembleForecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        if levels.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one confidence level is required".to_string(),
            ));
        }

        let mut contributions: Vec<Forecast> = Vec::with_capacity(self.forecasters.len());
        let mut degraded = false;
        let mut reasons = Vec::new();

        for forecaster in &self.forecasters {
            match forecaster.forecast(train, horizon, levels) {
                Ok(forecast) => contributions.push(forecast),
                Err(err) => {
                    warn!(
                        model = forecaster.name(),
                        error = %err,
                        "forecaster failed, falling back to persistence"
                    );
                    degraded = true;
                    reasons.push(format!("{}: {}", forecaster.name(), err));

                    match persistence_forecast(train, horizon, levels) {
                        Ok(fallback) => contributions.push(fallback),
                        Err(fallback_err) => {
                            reasons.push(format!("persistence fallback: {}", fallback_err));
                        }
                    }
                }
            }
        }

        if contributions.is_empty() {
            return Err(ForecastError::EnsembleFailure(reasons.join("; ")));
        }

        let forecast = average(&contributions)?;

        Ok(EnsembleForecast {
            forecast,
            degraded,
            reasons,
        })
    }
}

/// Naive last-observed-value forecast with intervals from the spread of
/// one-step price changes. Used as the degradation fallback.
pub fn persistence_forecast(train: &PriceSeries, horizon: usize, levels: &[u8]) -> Result<Forecast> {
    let prices = train.prices();
    let last = train.last();

    let sigma = if prices.len() >= 3 {
        let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
        let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
            / (diffs.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let points = vec![last.price; horizon];
    let steps = build_steps(last.date, &points, sigma, last.price, levels)?;
    Forecast::new(steps)
}

/// Arithmetic mean of point forecasts and interval bounds across models
fn average(contributions: &[Forecast]) -> Result<Forecast> {
    let first = &contributions[0];
    let count = contributions.len() as f64;

    for other in &contributions[1..] {
        if other.len() != first.len() {
            return Err(ForecastError::EnsembleFailure(format!(
                "constituent horizons disagree: {} vs {}",
                other.len(),
                first.len()
            )));
        }
    }

    let mut steps = Vec::with_capacity(first.len());
    for (idx, base) in first.steps().iter().enumerate() {
        let mut point = 0.0;
        let mut bounds: Vec<(u8, f64, f64)> = base
            .intervals
            .iter()
            .map(|i| (i.level, 0.0, 0.0))
            .collect();

        for contribution in contributions {
            let step = contribution.step(idx).ok_or_else(|| {
                ForecastError::EnsembleFailure("constituent step missing".to_string())
            })?;
            point += step.point;

            for (level, lower, upper) in &mut bounds {
                let interval = step.interval(*level).ok_or_else(|| {
                    ForecastError::EnsembleFailure(format!(
                        "constituent missing interval at level {}",
                        level
                    ))
                })?;
                *lower += interval.lower;
                *upper += interval.upper;
            }
        }

        steps.push(ForecastStep {
            date: base.date,
            point: point / count,
            intervals: bounds
                .into_iter()
                .map(|(level, lower, upper)| PredictionInterval {
                    level,
                    lower: lower / count,
                    upper: upper / count,
                })
                .collect(),
        });
    }

    Forecast::new(steps)
}
