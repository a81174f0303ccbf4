//! Accuracy and calibration metrics over backtest prediction records

use crate::backtest::PredictionRecord;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Directional ("up" vs "down") classification scores.
///
/// Ratios with a zero denominator are `None` rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalMetrics {
    /// Fraction of records with the correctly predicted direction
    pub accuracy: f64,
    /// Precision for the "up" class
    pub precision: Option<f64>,
    /// Recall for the "up" class
    pub recall: Option<f64>,
    /// F1 score for the "up" class
    pub f1_score: Option<f64>,
    /// Records that could be scored (non-zero actual delta)
    pub scored: usize,
}

/// Summary statistics for one backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error (0-100)
    pub mape: f64,
    /// Median absolute percentage error (0-100)
    pub median_ape: f64,
    /// Sample standard deviation of errors; undefined for a single record
    pub std_error: Option<f64>,
    /// Mean signed error
    pub mean_error: f64,
    /// Number of prediction records
    pub num_predictions: usize,
    /// Interval coverage per confidence level
    pub coverage: BTreeMap<u8, f64>,
    /// Directional scores; `None` when no record had a non-zero actual delta
    pub directional: Option<DirectionalMetrics>,
}

impl MetricsReport {
    /// Flat key/value view matching the reporting contract; undefined
    /// ratios stay `None` ("not applicable")
    pub fn to_key_values(&self) -> Vec<(String, Option<f64>)> {
        let mut pairs = vec![
            ("mae".to_string(), Some(self.mae)),
            ("rmse".to_string(), Some(self.rmse)),
            ("mape".to_string(), Some(self.mape)),
            ("median_ape".to_string(), Some(self.median_ape)),
            ("std_error".to_string(), self.std_error),
            ("mean_error".to_string(), Some(self.mean_error)),
            (
                "num_predictions".to_string(),
                Some(self.num_predictions as f64),
            ),
        ];

        for (&level, &coverage) in &self.coverage {
            pairs.push((format!("coverage_{}", level), Some(coverage)));
        }

        let directional = self.directional.as_ref();
        pairs.push((
            "accuracy".to_string(),
            directional.map(|d| d.accuracy),
        ));
        pairs.push((
            "precision".to_string(),
            directional.and_then(|d| d.precision),
        ));
        pairs.push(("recall".to_string(), directional.and_then(|d| d.recall)));
        pairs.push((
            "f1_score".to_string(),
            directional.and_then(|d| d.f1_score),
        ));

        pairs
    }

    /// Serialize the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ForecastError::Data(format!("metrics serialization failed: {}", e)))
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backtest Metrics ({} predictions):", self.num_predictions)?;
        for (key, value) in self.to_key_values() {
            match value {
                Some(v) => writeln!(f, "  {:<16} {:.4}", key, v)?,
                None => writeln!(f, "  {:<16} n/a", key)?,
            }
        }
        Ok(())
    }
}

/// Summarize a sequence of prediction records into a metrics report
pub fn summarize(records: &[PredictionRecord]) -> Result<MetricsReport> {
    if records.is_empty() {
        return Err(ForecastError::EmptyRecordSet);
    }

    let n = records.len() as f64;

    let mae = records.iter().map(|r| r.abs_error).sum::<f64>() / n;
    let rmse = (records.iter().map(|r| r.error.powi(2)).sum::<f64>() / n).sqrt();
    let mape = records.iter().map(|r| r.abs_pct_error).sum::<f64>() / n;
    let mean_error = records.iter().map(|r| r.error).sum::<f64>() / n;

    let std_error = if records.len() > 1 {
        let variance = records
            .iter()
            .map(|r| (r.error - mean_error).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    let mut apes: Vec<f64> = records.iter().map(|r| r.abs_pct_error).collect();
    apes.sort_by(|a, b| a.total_cmp(b));
    let median_ape = if apes.len() % 2 == 1 {
        apes[apes.len() / 2]
    } else {
        (apes[apes.len() / 2 - 1] + apes[apes.len() / 2]) / 2.0
    };

    let mut coverage = BTreeMap::new();
    for record in records {
        for outcome in &record.intervals {
            let counter = coverage.entry(outcome.level).or_insert(0usize);
            if outcome.in_interval {
                *counter += 1;
            }
        }
    }
    let coverage = coverage
        .into_iter()
        .map(|(level, hits)| (level, hits as f64 / n))
        .collect();

    Ok(MetricsReport {
        mae,
        rmse,
        mape,
        median_ape,
        std_error,
        mean_error,
        num_predictions: records.len(),
        coverage,
        directional: directional_metrics(records),
    })
}

/// Score each record's predicted vs realized direction relative to the last
/// training price. Records with zero actual delta are ties and excluded.
fn directional_metrics(records: &[PredictionRecord]) -> Option<DirectionalMetrics> {
    let mut scored = 0usize;
    let mut correct = 0usize;
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut false_negatives = 0usize;

    for record in records {
        let actual_delta = record.actual - record.previous_actual;
        if actual_delta == 0.0 {
            continue;
        }

        let actual_up = actual_delta > 0.0;
        let predicted_up = record.predicted > record.previous_actual;
        scored += 1;

        if actual_up == predicted_up {
            correct += 1;
            if actual_up {
                true_positives += 1;
            }
        } else if predicted_up {
            false_positives += 1;
        } else {
            false_negatives += 1;
        }
    }

    if scored == 0 {
        return None;
    }

    let ratio = |num: usize, den: usize| {
        if den == 0 {
            None
        } else {
            Some(num as f64 / den as f64)
        }
    };

    let precision = ratio(true_positives, true_positives + false_positives);
    let recall = ratio(true_positives, true_positives + false_negatives);
    let f1_score = match (precision, recall) {
        (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
        _ => None,
    };

    Some(DirectionalMetrics {
        accuracy: correct as f64 / scored as f64,
        precision,
        recall,
        f1_score,
        scored,
    })
}
