//! Damped additive Holt-Winters forecasting for monthly giving totals.
//!
//! State recursions (period `m`, damping `phi`):
//!
//! ```text
//! level_t  = alpha * (y_t - s_{t-m}) + (1 - alpha) * (level_{t-1} + phi * trend_{t-1})
//! trend_t  = beta * (level_t - level_{t-1}) + (1 - beta) * phi * trend_{t-1}
//! s_t      = gamma * (y_t - level_{t-1} - phi * trend_{t-1}) + (1 - gamma) * s_{t-m}
//! y_{n+h}  = level_n + (phi + phi^2 + ... + phi^h) * trend_n + s_{n+h-m}
//! ```
//!
//! Parameters are picked by minimizing the one-step-ahead sum of squared
//! errors; nothing is hand-tuned.

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::values;
use crate::donation::{ForecastPoint, MonthlyBucket};
use crate::error::FitError;
use crate::month::YearMonth;
use crate::simplex::Simplex;

/// Months per seasonal cycle
pub const SEASONAL_PERIODS: usize = 12;

/// Months projected past the last observation
pub const HORIZON: usize = 12;

const PHI_MIN: f64 = 0.8;
const PHI_MAX: f64 = 0.98;

/// Smoothing coefficients of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub phi: f64,
}

impl SmoothingParams {
    /// Map an unconstrained point onto the admissible region:
    /// 0 < alpha < 1, 0 < beta < alpha, 0 < gamma < 1 - alpha, phi in [0.8, 0.98].
    fn from_unconstrained(z: &[f64]) -> Self {
        let alpha = sigmoid(z[0]);
        Self {
            alpha,
            beta: alpha * sigmoid(z[1]),
            gamma: (1.0 - alpha) * sigmoid(z[2]),
            phi: PHI_MIN + (PHI_MAX - PHI_MIN) * sigmoid(z[3]),
        }
    }

    fn to_unconstrained(self) -> [f64; 4] {
        [
            logit(self.alpha),
            logit(self.beta / self.alpha),
            logit(self.gamma / (1.0 - self.alpha)),
            logit((self.phi - PHI_MIN) / (PHI_MAX - PHI_MIN)),
        ]
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

/// Deterministic starting points for the optimizer
const STARTS: [SmoothingParams; 6] = [
    SmoothingParams { alpha: 0.2, beta: 0.02, gamma: 0.1, phi: 0.9 },
    SmoothingParams { alpha: 0.5, beta: 0.05, gamma: 0.1, phi: 0.9 },
    SmoothingParams { alpha: 0.1, beta: 0.01, gamma: 0.3, phi: 0.95 },
    SmoothingParams { alpha: 0.3, beta: 0.1, gamma: 0.3, phi: 0.85 },
    SmoothingParams { alpha: 0.8, beta: 0.1, gamma: 0.1, phi: 0.95 },
    SmoothingParams { alpha: 0.05, beta: 0.005, gamma: 0.05, phi: 0.9 },
];

/// Starting states before the first observation
#[derive(Debug, Clone, PartialEq)]
struct InitialState {
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
}

impl InitialState {
    /// Trend is the per-month change between the means of the first two
    /// cycles. Seasonals average the detrended first two cycles and sum to
    /// zero. Level sits one step before the first observation.
    fn heuristic(y: &[f64], m: usize) -> Self {
        let first = mean(&y[..m]);
        let second = mean(&y[m..2 * m]);
        let trend = (second - first) / m as f64;
        let intercept = first - trend * (m - 1) as f64 / 2.0;

        let mut seasonals: Vec<f64> = (0..m)
            .map(|i| {
                let a = y[i] - (intercept + trend * i as f64);
                let b = y[i + m] - (intercept + trend * (i + m) as f64);
                (a + b) / 2.0
            })
            .collect();
        let offset = mean(&seasonals);
        seasonals.iter_mut().for_each(|s| *s -= offset);

        Self {
            level: intercept - trend,
            trend,
            seasonals,
        }
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Final states after running the recursions over a series
#[derive(Debug, Clone, PartialEq)]
struct Smoothed {
    level: f64,
    trend: f64,
    /// Seasonal components for the next `m` periods, in order
    next_seasonals: Vec<f64>,
    fitted: Vec<f64>,
    sse: f64,
}

fn smooth(y: &[f64], init: &InitialState, p: SmoothingParams) -> Smoothed {
    let m = init.seasonals.len();
    let mut seasonals = Vec::with_capacity(y.len() + m);
    seasonals.extend_from_slice(&init.seasonals);

    let mut level = init.level;
    let mut trend = init.trend;
    let mut fitted = Vec::with_capacity(y.len());
    let mut sse = 0.0;

    for (t, &obs) in y.iter().enumerate() {
        let season = seasonals[t];
        let damped = level + p.phi * trend;
        let yhat = damped + season;
        sse += (obs - yhat).powi(2);
        fitted.push(yhat);

        let new_level = p.alpha * (obs - season) + (1.0 - p.alpha) * damped;
        let new_trend = p.beta * (new_level - level) + (1.0 - p.beta) * p.phi * trend;
        seasonals.push(p.gamma * (obs - damped) + (1.0 - p.gamma) * season);

        level = new_level;
        trend = new_trend;
    }

    Smoothed {
        level,
        trend,
        next_seasonals: seasonals.split_off(y.len()),
        fitted,
        sse,
    }
}

/// Damped additive-trend, additive-seasonal exponential smoothing
#[derive(Debug, Clone, Copy)]
pub struct HoltWinters {
    seasonal_periods: usize,
    simplex: Simplex,
}

impl Default for HoltWinters {
    fn default() -> Self {
        Self::new(SEASONAL_PERIODS)
    }
}

impl HoltWinters {
    pub fn new(seasonal_periods: usize) -> Self {
        Self {
            seasonal_periods: seasonal_periods.max(1),
            simplex: Simplex::default(),
        }
    }

    /// Minimum series length: two full seasonal cycles
    pub fn min_observations(&self) -> usize {
        2 * self.seasonal_periods
    }

    fn validate(&self, y: &[f64]) -> Result<(), FitError> {
        let required = self.min_observations();
        if y.len() < required {
            return Err(FitError::TooShort { len: y.len(), required });
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite(i));
        }
        let first = y[0];
        let scale = y.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
        if y.iter().all(|v| (v - first).abs() <= 1e-12 * scale) {
            return Err(FitError::Constant(first));
        }
        Ok(())
    }

    /// Fit the model to `y` (oldest first).
    pub fn fit(&self, y: &[f64]) -> Result<FittedModel, FitError> {
        self.validate(y)?;
        let init = InitialState::heuristic(y, self.seasonal_periods);

        let objective = |z: &[f64]| smooth(y, &init, SmoothingParams::from_unconstrained(z)).sse;

        let mut best: Option<(Vec<f64>, f64)> = None;
        for start in STARTS {
            let min = self.simplex.minimize(objective, &start.to_unconstrained());
            debug!(sse = min.value, iterations = min.iterations, "simplex run finished");
            if !min.value.is_finite() {
                continue;
            }
            if best.as_ref().is_none_or(|(_, v)| min.value < *v) {
                best = Some((min.point, min.value));
            }
        }

        let (point, _) = best.ok_or(FitError::NoConvergence)?;
        let params = SmoothingParams::from_unconstrained(&point);
        let smoothed = smooth(y, &init, params);

        info!(
            observations = y.len(),
            alpha = params.alpha,
            beta = params.beta,
            gamma = params.gamma,
            phi = params.phi,
            sse = smoothed.sse,
            "fitted damped Holt-Winters model"
        );

        Ok(FittedModel {
            params,
            level: smoothed.level,
            trend: smoothed.trend,
            next_seasonals: smoothed.next_seasonals,
            fitted: smoothed.fitted,
            sse: smoothed.sse,
        })
    }
}

/// A fitted model, ready to project forward
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub params: SmoothingParams,
    level: f64,
    trend: f64,
    next_seasonals: Vec<f64>,
    fitted: Vec<f64>,
    sse: f64,
}

impl FittedModel {
    /// One-step-ahead in-sample predictions, aligned with the input
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Project `steps` periods past the last observation. Values are not
    /// clamped, so a falling series can project below zero.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let m = self.next_seasonals.len();
        let phi = self.params.phi;
        let mut damping = 0.0;
        let mut power = 1.0;

        (0..steps)
            .map(|h| {
                power *= phi;
                damping += power;
                self.level + damping * self.trend + self.next_seasonals[h % m]
            })
            .collect()
    }
}

/// Fit the default monthly model to `buckets` and project `HORIZON` months,
/// starting the month after the last bucket.
pub fn forecast_monthly(buckets: &[MonthlyBucket]) -> Result<Vec<ForecastPoint>, FitError> {
    let required = HoltWinters::default().min_observations();
    let last = match buckets.last() {
        Some(b) => YearMonth::of(b.period),
        None => return Err(FitError::TooShort { len: 0, required }),
    };

    let y = values(buckets);
    let model = HoltWinters::default().fit(&y)?;

    Ok(model
        .forecast(HORIZON)
        .into_iter()
        .enumerate()
        .map(|(h, value)| ForecastPoint {
            period: last.add_months(h as i64 + 1).first_day(),
            value,
        })
        .collect())
}
