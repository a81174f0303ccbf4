//! Seasonal exponential smoothing with automatic component selection

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::models::{build_steps, Forecast, Forecaster};

const ALPHA_GRID: [f64; 5] = [0.1, 0.2, 0.4, 0.6, 0.8];
const BETA_GRID: [f64; 3] = [0.05, 0.1, 0.2];
const GAMMA_GRID: [f64; 3] = [0.05, 0.1, 0.2];

/// Additive Holt-Winters model with automatic trend/seasonality selection.
///
/// Candidate structures (level, level+trend, level+seasonal,
/// level+trend+seasonal) are crossed with coarse smoothing-parameter grids
/// and scored by AIC on one-step-ahead errors; the winning candidate's
/// residual distribution drives the prediction intervals.
#[derive(Debug, Clone)]
pub struct SeasonalEts {
    name: String,
    season_length: usize,
}

/// Final smoothing state of one fitted candidate
struct EtsFit {
    use_trend: bool,
    use_seasonal: bool,
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    observations: usize,
    sigma: f64,
    aic: f64,
}

impl SeasonalEts {
    /// Create a model with the given seasonal period (7 for weekly)
    pub fn new(season_length: usize) -> Result<Self> {
        if season_length < 2 {
            return Err(ForecastError::InvalidParameter(
                "seasonal period must be at least 2".to_string(),
            ));
        }

        Ok(Self {
            name: format!("SeasonalETS(s={})", season_length),
            season_length,
        })
    }

    fn smooth(
        &self,
        prices: &[f64],
        use_trend: bool,
        use_seasonal: bool,
        alpha: f64,
        beta: f64,
        gamma: f64,
    ) -> Option<EtsFit> {
        let s = self.season_length;
        let n = prices.len();

        let (mut level, mut trend, mut seasonal, start) = if use_seasonal {
            let first_mean = prices[..s].iter().sum::<f64>() / s as f64;
            let second_mean = prices[s..2 * s].iter().sum::<f64>() / s as f64;
            let trend = if use_trend {
                (second_mean - first_mean) / s as f64
            } else {
                0.0
            };
            let seasonal: Vec<f64> = prices[..s].iter().map(|p| p - first_mean).collect();
            (first_mean, trend, seasonal, 0)
        } else {
            let trend = if use_trend { prices[1] - prices[0] } else { 0.0 };
            (prices[0], trend, vec![0.0; s], 1)
        };

        let warmup = if use_seasonal { s } else { start };
        let mut sse = 0.0;
        let mut residuals = 0usize;

        for t in start..n {
            let idx = t % s;
            let prediction = level + trend + seasonal[idx];

            if t >= warmup {
                sse += (prices[t] - prediction).powi(2);
                residuals += 1;
            }

            let new_level = alpha * (prices[t] - seasonal[idx]) + (1.0 - alpha) * (level + trend);
            if use_trend {
                trend = beta * (new_level - level) + (1.0 - beta) * trend;
            }
            if use_seasonal {
                seasonal[idx] = gamma * (prices[t] - new_level) + (1.0 - gamma) * seasonal[idx];
            }
            level = new_level;

            if !level.is_finite() || !trend.is_finite() {
                return None;
            }
        }

        if residuals == 0 {
            return None;
        }

        let mse = (sse / residuals as f64).max(f64::MIN_POSITIVE);
        let params = 1 + use_trend as usize + if use_seasonal { 1 + s } else { 0 };
        let aic = residuals as f64 * mse.ln() + 2.0 * params as f64;
        let sigma = mse.sqrt();

        if !sigma.is_finite() {
            return None;
        }

        Some(EtsFit {
            use_trend,
            use_seasonal,
            level,
            trend,
            seasonal,
            observations: n,
            sigma,
            aic,
        })
    }

    fn select(&self, prices: &[f64]) -> Result<EtsFit> {
        let mut best: Option<EtsFit> = None;

        for &use_trend in &[false, true] {
            for &use_seasonal in &[false, true] {
                let betas: &[f64] = if use_trend { &BETA_GRID } else { &[0.0] };
                let gammas: &[f64] = if use_seasonal { &GAMMA_GRID } else { &[0.0] };

                for &alpha in &ALPHA_GRID {
                    for &beta in betas {
                        for &gamma in gammas {
                            let candidate =
                                self.smooth(prices, use_trend, use_seasonal, alpha, beta, gamma);
                            if let Some(fit) = candidate {
                                match &best {
                                    Some(current) if current.aic <= fit.aic => {}
                                    _ => best = Some(fit),
                                }
                            }
                        }
                    }
                }
            }
        }

        best.ok_or_else(|| {
            ForecastError::ModelFit("no exponential smoothing candidate converged".to_string())
        })
    }
}

impl Forecaster for SeasonalEts {
    fn forecast(&self, train: &PriceSeries, horizon: usize, levels: &[u8]) -> Result<Forecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }

        let prices = train.prices();
        if prices.len() < self.min_observations() {
            return Err(ForecastError::InsufficientHistory {
                required: self.min_observations(),
                available: prices.len(),
            });
        }

        let fit = self.select(&prices)?;

        let s = self.season_length;
        let points: Vec<f64> = (1..=horizon)
            .map(|h| {
                let mut point = fit.level;
                if fit.use_trend {
                    point += h as f64 * fit.trend;
                }
                if fit.use_seasonal {
                    point += fit.seasonal[(fit.observations + h - 1) % s];
                }
                point
            })
            .collect();

        let last = train.last();
        let steps = build_steps(last.date, &points, fit.sigma, last.price, levels)?;
        Forecast::new(steps)
    }

    fn min_observations(&self) -> usize {
        2 * self.season_length
    }

    fn name(&self) -> &str {
        &self.name
    }
}
