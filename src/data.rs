//! Price series data handling for forecasting and backtesting

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// A single daily observation: calendar date and closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Closing price, strictly positive
    pub price: f64,
}

/// Immutable ordered series of daily prices.
///
/// Dates are strictly increasing and prices strictly positive; both are
/// enforced at construction so every consumer can rely on them.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a new price series, validating ordering and prices
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::Data("price series is empty".to_string()));
        }

        for point in &points {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(ForecastError::Data(format!(
                    "non-positive price {} on {}",
                    point.price, point.date
                )));
            }
        }

        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ForecastError::Data(format!(
                    "dates must be strictly increasing: {} follows {}",
                    pair[1].date, pair[0].date
                )));
            }
        }

        Ok(Self { points })
    }

    /// Load a price series from CSV with a `date,price` header
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut points = Vec::new();

        for row in csv_reader.deserialize() {
            let point: PricePoint = row?;
            points.push(point);
        }

        Self::new(points)
    }

    /// Get the observations
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Get the prices as a vector
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Get the dates as a vector
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// First observation
    pub fn first(&self) -> &PricePoint {
        // non-empty by construction
        &self.points[0]
    }

    /// Last observation
    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series is empty (never true for a constructed series)
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up the realized price on a date, if one exists
    pub fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.date.cmp(&date))
            .ok()
            .map(|idx| self.points[idx].price)
    }

    /// Look up the realized price on a date, failing with a data gap
    pub fn realized(&self, date: NaiveDate) -> Result<f64> {
        self.price_on(date).ok_or(ForecastError::DataGap(date))
    }

    /// The `n` most recent observations strictly before `date`.
    ///
    /// Returns `None` when fewer than `n` observations precede the date.
    pub fn window_before(&self, date: NaiveDate, n: usize) -> Option<PriceSeries> {
        if n == 0 {
            return None;
        }

        let end = self.points.partition_point(|p| p.date < date);
        if end < n {
            return None;
        }

        Some(PriceSeries {
            points: self.points[end - n..end].to_vec(),
        })
    }

    /// Observations with `start <= date <= end`
    pub fn slice_between(&self, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);

        if lo >= hi {
            return Err(ForecastError::Data(format!(
                "no observations between {} and {}",
                start, end
            )));
        }

        Ok(PriceSeries {
            points: self.points[lo..hi].to_vec(),
        })
    }

    /// Mean of the prices
    pub fn mean(&self) -> f64 {
        let sum: f64 = self.points.iter().map(|p| p.price).sum();
        sum / self.points.len() as f64
    }
}
