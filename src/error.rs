//! Error types for the forecast_backtest crate

use chrono::NaiveDate;
use thiserror::Error;

/// Custom error types for the forecast_backtest crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Training window too short for a model's minimum
    #[error("insufficient history: need at least {required} observations, have {available}")]
    InsufficientHistory {
        /// Minimum observations the model needs
        required: usize,
        /// Observations actually available
        available: usize,
    },

    /// Numerical failure while fitting a model
    #[error("model fit error: {0}")]
    ModelFit(String),

    /// Every constituent forecaster failed for a window
    #[error("ensemble failure: {0}")]
    EnsembleFailure(String),

    /// Metrics requested over zero prediction records
    #[error("empty record set: no prediction records to summarize")]
    EmptyRecordSet,

    /// A forecasted date has no matching realized price
    #[error("data gap: no realized price on {0}")]
    DataGap(NaiveDate),

    /// Error from invalid parameters
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("data error: {0}")]
    Data(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV operations
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
