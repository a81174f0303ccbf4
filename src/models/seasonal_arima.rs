//! Seasonal autoregressive-integrated model with automatic order selection

use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::models::{build_steps, Forecast, Forecaster};

/// Autoregressive-integrated model with a weekly seasonal lag.
///
/// The series is differenced once, then the differenced value is regressed
/// on `p` autoregressive lags plus the seasonal lag. The order `p` is chosen
/// automatically by AIC over a small candidate range; prediction intervals
/// come from the residual standard deviation of the winning fit.
#[derive(Debug, Clone)]
pub struct SeasonalArima {
    name: String,
    season_length: usize,
    max_order: usize,
}

/// One candidate autoregression fit
struct ArFit {
    order: usize,
    coefficients: Vec<f64>,
    sigma: f64,
    aic: f64,
}

impl SeasonalArima {
    /// Create a model with the given seasonal period (7 for weekly)
    pub fn new(season_length: usize) -> Result<Self> {
        if season_length < 2 {
            return Err(ForecastError::InvalidParameter(
                "seasonal period must be at least 2".to_string(),
            ));
        }

        Ok(Self {
            name: format!("SeasonalARIMA(s={})", season_length),
            season_length,
            max_order: 3,
        })
    }

    /// Override the maximum autoregressive order searched
    pub fn with_max_order(mut self, max_order: usize) -> Result<Self> {
        if max_order == 0 {
            return Err(ForecastError::InvalidParameter(
                "maximum AR order must be positive".to_string(),
            ));
        }

        self.max_order = max_order;
        self.name = format!(
            "SeasonalARIMA(s={}, p<={})",
            self.season_length, max_order
        );
        Ok(self)
    }

    fn fit(&self, diffs: &[f64], order: usize) -> Result<ArFit> {
        let s = self.season_length;
        let k = order + 2; // intercept, AR lags, seasonal lag
        let start = order.max(s);
        let rows = diffs.len() - start;

        if rows <= k {
            return Err(ForecastError::ModelFit(format!(
                "only {} regression rows for {} coefficients",
                rows, k
            )));
        }

        // Normal equations X'X b = X'y, accumulated row by row
        let mut xtx = vec![vec![0.0; k]; k];
        let mut xty = vec![0.0; k];
        let mut regressors = vec![0.0; k];

        for t in start..diffs.len() {
            regressors[0] = 1.0;
            for lag in 1..=order {
                regressors[lag] = diffs[t - lag];
            }
            regressors[k - 1] = diffs[t - s];

            for i in 0..k {
                for j in 0..k {
                    xtx[i][j] += regressors[i] * regressors[j];
                }
                xty[i] += regressors[i] * diffs[t];
            }
        }

        // Small ridge term keeps near-collinear windows solvable
        for i in 0..k {
            xtx[i][i] += 1e-8 * (1.0 + xtx[i][i].abs());
        }

        let coefficients = solve_linear(xtx, xty)?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::ModelFit(
                "non-finite autoregressive coefficients".to_string(),
            ));
        }

        let mut sse = 0.0;
        for t in start..diffs.len() {
            let mut fitted = coefficients[0];
            for lag in 1..=order {
                fitted += coefficients[lag] * diffs[t - lag];
            }
            fitted += coefficients[k - 1] * diffs[t - s];
            sse += (diffs[t] - fitted).powi(2);
        }

        if !sse.is_finite() {
            return Err(ForecastError::ModelFit(
                "residual variance did not converge".to_string(),
            ));
        }

        let n = rows as f64;
        let sigma = (sse / (rows - k) as f64).sqrt();
        let aic = n * (sse / n).max(f64::MIN_POSITIVE).ln() + 2.0 * (k + 1) as f64;

        Ok(ArFit {
            order,
            coefficients,
            sigma,
            aic,
        })
    }

    fn forecast_diffs(&self, fit: &ArFit, diffs: &[f64], horizon: usize) -> Vec<f64> {
        let s = self.season_length;
        let k = fit.coefficients.len();
        let mut history = diffs.to_vec();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut value = fit.coefficients[0];
            for lag in 1..=fit.order {
                value += fit.coefficients[lag] * history[history.len() - lag];
            }
            value += fit.coefficients[k - 1] * history[history.len() - s];

            history.push(value);
            forecasts.push(value);
        }

        forecasts
    }
}

impl Forecaster for SeasonalArima {
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

        let diffs: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        let mut best: Option<ArFit> = None;
        for order in 1..=self.max_order {
            let candidate = self.fit(&diffs, order)?;
            match &best {
                Some(current) if current.aic <= candidate.aic => {}
                _ => best = Some(candidate),
            }
        }
        let fit = best.ok_or_else(|| {
            ForecastError::ModelFit("no autoregressive order converged".to_string())
        })?;

        let diff_forecasts = self.forecast_diffs(&fit, &diffs, horizon);

        let last = train.last();
        let mut level = last.price;
        let points: Vec<f64> = diff_forecasts
            .iter()
            .map(|d| {
                level += d;
                level
            })
            .collect();

        let steps = build_steps(last.date, &points, fit.sigma, last.price, levels)?;
        Forecast::new(steps)
    }

    fn min_observations(&self) -> usize {
        2 * self.season_length + self.max_order + 2
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Solve a dense linear system by Gaussian elimination with partial pivoting
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }

        if a[pivot][col].abs() < 1e-12 {
            return Err(ForecastError::ModelFit(
                "singular design matrix in autoregression".to_string(),
            ));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for j in row + 1..n {
            sum -= a[row][j] * x[j];
        }
        x[row] = sum / a[row][row];
    }

    Ok(x)
}
