//! # forecast_backtest
//!
//! Daily asset price forecasting with rolling-window walk-forward
//! backtesting and a forecast-to-signal decision layer.
//!
//! The pipeline:
//!
//! 1. [`PriceSeries`] loads and validates a daily price history.
//! 2. [`ForecastEnsemble`] combines a weekly-seasonal ARIMA-style model
//!    and an additive Holt-Winters model by equal weighting, falling back
//!    to naive persistence when a constituent fails.
//! 3. [`RollingBacktester`] walks the ensemble forward over a named
//!    period, producing one [`PredictionRecord`] per realized forecast.
//! 4. [`summarize`] condenses the records into accuracy, calibration and
//!    directional metrics.
//! 5. [`SignalGenerator`] turns a live forecast into a graded trading
//!    directive.
//!
//! ## Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use forecast_backtest::{
//!     summarize, BacktestPeriod, ForecastEnsemble, PriceSeries, RollingBacktester,
//! };
//!
//! # fn main() -> forecast_backtest::Result<()> {
//! let file = std::fs::File::open("prices.csv")?;
//! let series = PriceSeries::from_csv(file)?;
//!
//! let period = BacktestPeriod::new(
//!     "bull-2024",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).ok_or_else(|| {
//!         forecast_backtest::ForecastError::InvalidParameter("bad date".into())
//!     })?,
//!     NaiveDate::from_ymd_opt(2024, 12, 31).ok_or_else(|| {
//!         forecast_backtest::ForecastError::InvalidParameter("bad date".into())
//!     })?,
//! )?;
//!
//! let backtester = RollingBacktester::new(ForecastEnsemble::with_default_models()?);
//! let run = backtester.run(&series, &period)?;
//! let report = summarize(&run.records)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod backtest;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod models;
pub mod signal;
pub mod volatility;

pub use backtest::{
    write_records_csv, BacktestPeriod, BacktestRun, ForecastWindow, IntervalOutcome,
    PredictionRecord, RollingBacktester, WindowFailure,
};
pub use data::{PricePoint, PriceSeries};
pub use ensemble::{persistence_forecast, EnsembleForecast, ForecastEnsemble};
pub use error::{ForecastError, Result};
pub use metrics::{summarize, DirectionalMetrics, MetricsReport};
pub use models::seasonal_arima::SeasonalArima;
pub use models::seasonal_ets::SeasonalEts;
pub use models::{Forecast, ForecastStep, Forecaster, PredictionInterval};
pub use signal::{
    write_signals_csv, Direction, MarketContext, PositionSize, Signal, SignalGenerator,
    SignalThresholds,
};
pub use volatility::{ewma_volatility, rolling_volatility, simple_returns, trailing_volatility};

/// Library name, from the build manifest
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library version, from the build manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
