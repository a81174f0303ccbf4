//! Forecast-to-signal decision layer

use crate::error::{ForecastError, Result};
use crate::models::Forecast;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Recommended trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Buy
    Long,
    /// Sell
    Short,
    /// Stay out
    Hold,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Recommended position size tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSize {
    /// No position
    None,
    /// Small position
    Small,
    /// Medium position
    Medium,
    /// Large position
    Large,
}

impl fmt::Display for PositionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSize::None => write!(f, "NONE"),
            PositionSize::Small => write!(f, "SMALL"),
            PositionSize::Medium => write!(f, "MEDIUM"),
            PositionSize::Large => write!(f, "LARGE"),
        }
    }
}

/// Historical context the signal layer needs from its caller: the last
/// observed price and a trailing volatility measure (as a fraction)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Most recent observed price
    pub last_price: f64,
    /// Trailing volatility as a fraction (e.g. 0.05 for 5%)
    pub trailing_volatility: f64,
}

impl MarketContext {
    /// Create a context, validating the price and volatility
    pub fn new(last_price: f64, trailing_volatility: f64) -> Result<Self> {
        if !last_price.is_finite() || last_price <= 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "last price must be positive, got {}",
                last_price
            )));
        }
        if !trailing_volatility.is_finite() || trailing_volatility < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "trailing volatility must be non-negative, got {}",
                trailing_volatility
            )));
        }

        Ok(Self {
            last_price,
            trailing_volatility,
        })
    }
}

/// Thresholds of the decision rule table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// Minimum confidence score to trade at all
    pub min_confidence: f64,
    /// Minimum direction probability to trade at all
    pub min_direction_probability: f64,
    /// Confidence floor for a large position
    pub large_confidence: f64,
    /// 80%-range width ceiling (percent of price) for a large position
    pub large_max_width_pct: f64,
    /// Confidence floor for a medium position
    pub medium_confidence: f64,
    /// 80%-range width ceiling (percent of price) for a medium position
    pub medium_max_width_pct: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
            min_direction_probability: 60.0,
            large_confidence: 75.0,
            large_max_width_pct: 3.0,
            medium_confidence: 65.0,
            medium_max_width_pct: 5.0,
        }
    }
}

/// A graded trading directive for one forecasted day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// 1-based horizon day index
    pub day_index: usize,
    /// Forecasted date
    pub date: NaiveDate,
    /// Point prediction for the day
    pub predicted_price: f64,
    /// Predicted percent change from the last observed price (0-100 scale)
    pub pct_change: f64,
    /// Confidence score, 0-100
    pub confidence_score: f64,
    /// Direction probability, 0-100
    pub direction_probability: f64,
    /// 80% interval bounds
    pub range_80: (f64, f64),
    /// 95% interval bounds, when forecast carries that level
    pub range_95: Option<(f64, f64)>,
    /// 80% interval width as percent of the last price
    pub range_80_width_pct: f64,
    /// 95% interval width as percent of the last price
    pub range_95_width_pct: Option<f64>,
    /// Recommended direction
    pub direction: Direction,
    /// Recommended position size
    pub position_size: PositionSize,
    /// Ordered names of the rules that fired; informational only
    pub reasoning: Vec<String>,
}

/// Converts forecasts into trading directives. Stateless: every call is a
/// pure function of the forecast and the market context.
#[derive(Debug, Clone, Default)]
pub struct SignalGenerator {
    thresholds: SignalThresholds,
}

impl SignalGenerator {
    /// Generator with the default rule-table thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with custom thresholds
    pub fn with_thresholds(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// Generate the signal for one forecasted day (`horizon_day` is 1-based)
    pub fn generate(
        &self,
        forecast: &Forecast,
        context: &MarketContext,
        horizon_day: usize,
    ) -> Result<Signal> {
        if horizon_day == 0 || horizon_day > forecast.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "horizon day {} outside forecast of {} days",
                horizon_day,
                forecast.len()
            )));
        }

        let step = forecast
            .step(horizon_day - 1)
            .ok_or_else(|| ForecastError::InvalidParameter("missing forecast step".to_string()))?;
        let interval_80 = step.interval(80).ok_or_else(|| {
            ForecastError::InvalidParameter(
                "signal generation requires an 80% prediction interval".to_string(),
            )
        })?;
        let interval_95 = step.interval(95);

        let last_price = context.last_price;
        let pct_change_frac = (step.point - last_price) / last_price;
        let width_80_frac = (interval_80.upper - interval_80.lower) / last_price;

        let confidence_score = confidence_score(width_80_frac, context.trailing_volatility);
        let direction_probability = direction_probability(pct_change_frac, width_80_frac);

        let (direction, position_size, reasoning) = decide(
            confidence_score,
            direction_probability,
            pct_change_frac * 100.0,
            width_80_frac * 100.0,
            &self.thresholds,
        );

        Ok(Signal {
            day_index: horizon_day,
            date: step.date,
            predicted_price: step.point,
            pct_change: pct_change_frac * 100.0,
            confidence_score,
            direction_probability,
            range_80: (interval_80.lower, interval_80.upper),
            range_95: interval_95.map(|i| (i.lower, i.upper)),
            range_80_width_pct: width_80_frac * 100.0,
            range_95_width_pct: interval_95.map(|i| (i.upper - i.lower) / last_price * 100.0),
            direction,
            position_size,
            reasoning,
        })
    }

    /// Generate one signal per forecasted day
    pub fn generate_all(&self, forecast: &Forecast, context: &MarketContext) -> Result<Vec<Signal>> {
        (1..=forecast.len())
            .map(|day| self.generate(forecast, context, day))
            .collect()
    }
}

/// Confidence score from the 80%-interval width normalized by trailing
/// volatility: narrower-than-typical intervals score higher. 0-100, clipped.
pub fn confidence_score(width_80_frac: f64, trailing_volatility: f64) -> f64 {
    if trailing_volatility <= 0.0 {
        return 0.0;
    }

    let normalized_width = width_80_frac / trailing_volatility;
    (100.0 - normalized_width * 20.0).clamp(0.0, 100.0)
}

/// Direction probability from the predicted move relative to the 80%
/// interval width: a move smaller than the interval is near a coin flip.
/// 0-100, clipped.
pub fn direction_probability(pct_change_frac: f64, width_80_frac: f64) -> f64 {
    if width_80_frac <= 0.0 {
        return if pct_change_frac == 0.0 { 50.0 } else { 100.0 };
    }

    50.0 + 50.0 * (pct_change_frac.abs() / width_80_frac).min(1.0)
}

/// The decision rule table, evaluated in order with first match winning.
/// Returns the direction, size tier and the ordered rule names that fired.
pub fn decide(
    confidence_score: f64,
    direction_probability: f64,
    pct_change: f64,
    range_80_width_pct: f64,
    thresholds: &SignalThresholds,
) -> (Direction, PositionSize, Vec<String>) {
    let mut reasoning = Vec::new();

    if confidence_score < thresholds.min_confidence
        || direction_probability < thresholds.min_direction_probability
    {
        if confidence_score < thresholds.min_confidence {
            reasoning.push("low confidence".to_string());
        }
        if direction_probability < thresholds.min_direction_probability {
            reasoning.push("weak directional signal".to_string());
        }
        return (Direction::Hold, PositionSize::None, reasoning);
    }

    reasoning.push("strong directional signal".to_string());
    let direction = if pct_change > 0.0 {
        reasoning.push("predicted upside".to_string());
        Direction::Long
    } else {
        reasoning.push("predicted downside".to_string());
        Direction::Short
    };

    if confidence_score >= thresholds.large_confidence {
        reasoning.push("high confidence".to_string());
    } else if confidence_score >= thresholds.medium_confidence {
        reasoning.push("moderate confidence".to_string());
    }
    if range_80_width_pct < thresholds.large_max_width_pct {
        reasoning.push("tight range".to_string());
    } else if range_80_width_pct < thresholds.medium_max_width_pct {
        reasoning.push("moderate range".to_string());
    }

    let position_size = if confidence_score >= thresholds.large_confidence
        && range_80_width_pct < thresholds.large_max_width_pct
    {
        PositionSize::Large
    } else if confidence_score >= thresholds.medium_confidence
        && range_80_width_pct < thresholds.medium_max_width_pct
    {
        PositionSize::Medium
    } else {
        PositionSize::Small
    };

    (direction, position_size, reasoning)
}

/// Write signals in the fixed signal-output column contract
pub fn write_signals_csv<W: Write>(signals: &[Signal], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "day_index",
        "date",
        "predicted_price",
        "pct_change",
        "confidence_score",
        "direction_probability",
        "range_80_low",
        "range_80_high",
        "range_95_low",
        "range_95_high",
        "signal",
        "position_size",
        "reasoning",
    ])?;

    for signal in signals {
        let (low_95, high_95) = match signal.range_95 {
            Some((low, high)) => (low.to_string(), high.to_string()),
            None => (String::new(), String::new()),
        };

        csv_writer.write_record([
            signal.day_index.to_string(),
            signal.date.to_string(),
            signal.predicted_price.to_string(),
            signal.pct_change.to_string(),
            signal.confidence_score.to_string(),
            signal.direction_probability.to_string(),
            signal.range_80.0.to_string(),
            signal.range_80.1.to_string(),
            low_95,
            high_95,
            signal.direction.to_string(),
            signal.position_size.to_string(),
            signal.reasoning.join("; "),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
