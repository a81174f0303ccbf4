//! Rolling-window walk-forward backtesting

use crate::data::PriceSeries;
use crate::ensemble::ForecastEnsemble;
use crate::error::{ForecastError, Result};
use crate::models::ForecastStep;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, warn};

/// A named walk-forward backtest configuration.
///
/// Construction and the builder setters validate field-level invariants
/// (positive sizes, ordered dates, confidence levels in (0, 100), sorted
/// and deduplicated). The cross-field requirement that the period span at
/// least `window_size + horizon` days is checked by [`validate`] on the
/// final configuration, which the backtester does before running.
///
/// [`validate`]: BacktestPeriod::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestPeriod {
    /// Human-readable name, e.g. "Recent 90 days"
    pub name: String,
    /// First cursor date of the walk-forward loop
    pub start_date: NaiveDate,
    /// Last date forecasts may target
    pub end_date: NaiveDate,
    /// Forecast horizon in days
    pub horizon: usize,
    /// Training window size in days
    pub window_size: usize,
    /// Days the cursor advances between windows
    pub step_size: usize,
    /// Confidence levels as percentages
    pub confidence_levels: Vec<u8>,
}

impl BacktestPeriod {
    /// Create a period with the default horizon (1), window (365), step (7)
    /// and confidence levels (80, 95)
    pub fn new(name: &str, start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        let period = Self {
            name: name.to_string(),
            start_date,
            end_date,
            horizon: 1,
            window_size: 365,
            step_size: 7,
            confidence_levels: vec![80, 95],
        };
        period.validate_fields()?;
        Ok(period)
    }

    /// Set the forecast horizon
    pub fn with_horizon(mut self, horizon: usize) -> Result<Self> {
        self.horizon = horizon;
        self.validate_fields()?;
        Ok(self)
    }

    /// Set the training window size
    pub fn with_window_size(mut self, window_size: usize) -> Result<Self> {
        self.window_size = window_size;
        self.validate_fields()?;
        Ok(self)
    }

    /// Set the cursor step size
    pub fn with_step_size(mut self, step_size: usize) -> Result<Self> {
        self.step_size = step_size;
        self.validate_fields()?;
        Ok(self)
    }

    /// Set the confidence levels (normalized to sorted unique values)
    pub fn with_confidence_levels(mut self, levels: &[u8]) -> Result<Self> {
        let mut levels = levels.to_vec();
        levels.sort_unstable();
        levels.dedup();
        self.confidence_levels = levels;
        self.validate_fields()?;
        Ok(self)
    }

    /// Check the full configuration, including the cross-field requirement
    /// that the period spans at least `window_size + horizon` days
    pub fn validate(&self) -> Result<()> {
        self.validate_fields()?;

        let span_days = (self.end_date - self.start_date).num_days() + 1;
        let required = (self.window_size + self.horizon) as i64;
        if span_days < required {
            return Err(ForecastError::InvalidParameter(format!(
                "period '{}' spans {} days but window_size + horizon requires {}",
                self.name, span_days, required
            )));
        }

        Ok(())
    }

    fn validate_fields(&self) -> Result<()> {
        if self.horizon == 0 || self.window_size == 0 || self.step_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon, window size and step size must all be positive".to_string(),
            ));
        }

        if self.end_date <= self.start_date {
            return Err(ForecastError::InvalidParameter(format!(
                "period '{}' ends {} before it starts {}",
                self.name, self.end_date, self.start_date
            )));
        }

        if self.confidence_levels.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one confidence level is required".to_string(),
            ));
        }
        for &level in &self.confidence_levels {
            if level == 0 || level >= 100 {
                return Err(ForecastError::InvalidParameter(format!(
                    "confidence level must be between 1 and 99, got {}",
                    level
                )));
            }
        }

        Ok(())
    }
}

/// The training slice and forecast scope of a single window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWindow {
    /// First date of the training window
    pub train_start: NaiveDate,
    /// Last date of the training window
    pub train_end: NaiveDate,
    /// Forecast horizon in days
    pub horizon: usize,
    /// Confidence levels requested
    pub confidence_levels: Vec<u8>,
}

impl ForecastWindow {
    /// Build a window, enforcing the no-leakage boundary against the first
    /// forecasted date
    pub fn new(
        train_start: NaiveDate,
        train_end: NaiveDate,
        horizon: usize,
        confidence_levels: Vec<u8>,
        first_forecast_date: NaiveDate,
    ) -> Result<Self> {
        if train_end >= first_forecast_date {
            return Err(ForecastError::Data(format!(
                "training window ending {} leaks into forecast starting {}",
                train_end, first_forecast_date
            )));
        }

        Ok(Self {
            train_start,
            train_end,
            horizon,
            confidence_levels,
        })
    }
}

/// Realized outcome of one prediction interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalOutcome {
    /// Confidence level as a percentage
    pub level: u8,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Whether the realized price fell inside the interval
    pub in_interval: bool,
}

/// One realized forecast evaluation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// First date of the training window
    pub train_start: NaiveDate,
    /// Last date of the training window
    pub train_end: NaiveDate,
    /// Date the forecast targeted
    pub forecast_date: NaiveDate,
    /// Last training price, the anchor for directional scoring
    pub previous_actual: f64,
    /// Realized price on the forecast date
    pub actual: f64,
    /// Point prediction
    pub predicted: f64,
    /// actual - predicted
    pub error: f64,
    /// |actual - predicted|
    pub abs_error: f64,
    /// Signed percent error relative to the realized price
    pub pct_error: f64,
    /// Absolute percent error relative to the realized price
    pub abs_pct_error: f64,
    /// Realized interval outcomes per confidence level
    pub intervals: Vec<IntervalOutcome>,
    /// Whether the window's ensemble forecast was degraded
    pub degraded: bool,
}

impl PredictionRecord {
    fn build(
        window: &ForecastWindow,
        step: &ForecastStep,
        actual: f64,
        previous_actual: f64,
        degraded: bool,
    ) -> Result<Self> {
        if window.train_end >= step.date {
            return Err(ForecastError::Data(format!(
                "training window ending {} leaks into forecast for {}",
                window.train_end, step.date
            )));
        }

        let error = actual - step.point;
        let intervals = step
            .intervals
            .iter()
            .map(|i| IntervalOutcome {
                level: i.level,
                lower: i.lower,
                upper: i.upper,
                in_interval: i.lower <= actual && actual <= i.upper,
            })
            .collect();

        Ok(Self {
            train_start: window.train_start,
            train_end: window.train_end,
            forecast_date: step.date,
            previous_actual,
            actual,
            predicted: step.point,
            error,
            abs_error: error.abs(),
            pct_error: (error / actual) * 100.0,
            abs_pct_error: (error / actual).abs() * 100.0,
            intervals,
            degraded,
        })
    }

    /// The interval outcome at a confidence level, if recorded
    pub fn interval(&self, level: u8) -> Option<&IntervalOutcome> {
        self.intervals.iter().find(|i| i.level == level)
    }
}

/// A window the backtest attempted but could not evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFailure {
    /// Cursor date of the failed window
    pub cursor: NaiveDate,
    /// Why it failed
    pub reason: String,
}

/// The full outcome of one walk-forward run
#[derive(Debug, Clone)]
pub struct BacktestRun {
    /// Name of the period that was run
    pub period: String,
    /// Prediction records in window order
    pub records: Vec<PredictionRecord>,
    /// Windows that were skipped, with reasons
    pub window_failures: Vec<WindowFailure>,
    /// Windows whose ensemble call succeeded
    pub windows_evaluated: usize,
    /// Evaluated windows that were flagged degraded
    pub windows_degraded: usize,
}

/// Drives walk-forward evaluation of a forecast ensemble over a price series
#[derive(Debug)]
pub struct RollingBacktester {
    ensemble: ForecastEnsemble,
}

impl RollingBacktester {
    /// Create a backtester around an ensemble
    pub fn new(ensemble: ForecastEnsemble) -> Self {
        Self { ensemble }
    }

    /// Walk the period forward, forecasting each window and scoring every
    /// forecasted day against its realized price.
    ///
    /// Per-window failures are recorded and skipped; only a period with zero
    /// successful windows is a hard error.
    pub fn run(&self, series: &PriceSeries, period: &BacktestPeriod) -> Result<BacktestRun> {
        period.validate()?;

        if series.len() < period.window_size + period.horizon {
            return Err(ForecastError::Data(format!(
                "series has {} points but period '{}' needs at least {}",
                series.len(),
                period.name,
                period.window_size + period.horizon
            )));
        }

        let mut records = Vec::new();
        let mut window_failures = Vec::new();
        let mut windows_evaluated = 0usize;
        let mut windows_degraded = 0usize;

        let horizon_span = Duration::days(period.horizon as i64);
        let step_span = Duration::days(period.step_size as i64);
        let mut cursor = period.start_date;

        while cursor + horizon_span <= period.end_date {
            match self.evaluate_window(series, period, cursor) {
                Ok((window_records, degraded)) => {
                    windows_evaluated += 1;
                    if degraded {
                        windows_degraded += 1;
                    }
                    records.extend(window_records);
                }
                Err(err) => {
                    warn!(cursor = %cursor, error = %err, "skipping backtest window");
                    window_failures.push(WindowFailure {
                        cursor,
                        reason: err.to_string(),
                    });
                }
            }

            cursor += step_span;
        }

        if windows_evaluated == 0 {
            return Err(ForecastError::EnsembleFailure(format!(
                "no successful windows in period '{}'",
                period.name
            )));
        }

        Ok(BacktestRun {
            period: period.name.clone(),
            records,
            window_failures,
            windows_evaluated,
            windows_degraded,
        })
    }

    fn evaluate_window(
        &self,
        series: &PriceSeries,
        period: &BacktestPeriod,
        cursor: NaiveDate,
    ) -> Result<(Vec<PredictionRecord>, bool)> {
        let train = series
            .window_before(cursor, period.window_size)
            .ok_or_else(|| {
                ForecastError::Data(format!(
                    "fewer than {} observations before {}",
                    period.window_size, cursor
                ))
            })?;

        let ensemble_forecast =
            self.ensemble
                .forecast(&train, period.horizon, &period.confidence_levels)?;

        let previous_actual = train.last().price;
        let window = ForecastWindow::new(
            train.first().date,
            train.last().date,
            period.horizon,
            period.confidence_levels.clone(),
            ensemble_forecast
                .forecast
                .step(0)
                .map(|s| s.date)
                .ok_or_else(|| ForecastError::EnsembleFailure("empty forecast".to_string()))?,
        )?;

        let mut window_records = Vec::new();
        for step in ensemble_forecast.forecast.steps() {
            if step.date > period.end_date {
                break;
            }
            match series.realized(step.date) {
                Ok(actual) => {
                    window_records.push(PredictionRecord::build(
                        &window,
                        step,
                        actual,
                        previous_actual,
                        ensemble_forecast.degraded,
                    )?);
                }
                Err(ForecastError::DataGap(date)) => {
                    debug!(date = %date, "no realized price, skipping forecasted day");
                }
                Err(other) => return Err(other),
            }
        }

        Ok((window_records, ensemble_forecast.degraded))
    }
}

/// Write prediction records in the fixed backtest-output column contract
pub fn write_records_csv<W: Write>(records: &[PredictionRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "train_start",
        "train_end",
        "forecast_date",
        "actual",
        "predicted",
        "error",
        "abs_error",
        "pct_error",
        "abs_pct_error",
        "lower_80",
        "upper_80",
        "in_interval_80",
        "lower_95",
        "upper_95",
        "in_interval_95",
    ])?;

    for record in records {
        let mut row = vec![
            record.train_start.to_string(),
            record.train_end.to_string(),
            record.forecast_date.to_string(),
            record.actual.to_string(),
            record.predicted.to_string(),
            record.error.to_string(),
            record.abs_error.to_string(),
            record.pct_error.to_string(),
            record.abs_pct_error.to_string(),
        ];

        for level in [80u8, 95u8] {
            match record.interval(level) {
                Some(outcome) => {
                    row.push(outcome.lower.to_string());
                    row.push(outcome.upper.to_string());
                    row.push(outcome.in_interval.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }

        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
