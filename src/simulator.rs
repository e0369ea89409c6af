use chrono::NaiveDate;

use crate::error::{ensure_finite, ForecastError, Result};
use crate::features::TARGET_SCALE;
use crate::indicator::ema::ema_series_with_warmup;
use crate::interpolate::fill_missing;
use crate::model::price::{business_days_from, PricePoint};

pub const DEFAULT_HORIZON: usize = 365;
pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct SimulatorConfig {
    pub horizon: usize,
    pub smoothing_window: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedPath {
    pub dates: Vec<NaiveDate>,
    pub raw: Vec<f64>,
    pub smoothed: Vec<f64>,
}

/// `p[0] = last_price`, `p[t] = p[t-1] * exp(pred[t-1] / 1000)`.
///
/// Needs at least `horizon - 1` predictions; extra ones are ignored and a
/// shorter slice is rejected rather than wrapped around.
pub fn compound_path(last_price: f64, predictions: &[f64], horizon: usize) -> Result<Vec<f64>> {
    if horizon == 0 {
        return Err(ForecastError::Config("horizon must be > 0".to_string()));
    }
    if !last_price.is_finite() || last_price <= 0.0 {
        return Err(ForecastError::InvalidSeries(format!(
            "last observed price must be positive and finite, got {}",
            last_price
        )));
    }
    let needed = horizon - 1;
    if predictions.len() < needed {
        return Err(ForecastError::InsufficientData {
            stage: "simulation",
            needed,
            available: predictions.len(),
        });
    }
    let mut path = Vec::with_capacity(horizon);
    path.push(last_price);
    for pred in &predictions[..needed] {
        let prev = path[path.len() - 1];
        path.push(prev * (pred / TARGET_SCALE).exp());
    }
    ensure_finite("simulated path", &path)?;
    Ok(path)
}

/// EMA with a `window`-long lead-in; the first point is pinned to the raw
/// value and the remaining lead-in is filled by monotone cubic interpolation.
pub fn smooth_path(raw: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(ForecastError::Config(
            "smoothing window must be > 0".to_string(),
        ));
    }
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let mut smoothed = ema_series_with_warmup(raw, window, window);
    smoothed[0] = Some(raw[0]);
    let filled = fill_missing(&smoothed)?;
    ensure_finite("smoothed path", &filled)?;
    Ok(filled)
}

#[derive(Debug, Clone)]
pub struct Simulator {
    cfg: SimulatorConfig,
}

impl Simulator {
    pub fn new(cfg: SimulatorConfig) -> Self {
        Self { cfg }
    }

    pub fn run(&self, predictions: &[f64], last: &PricePoint) -> Result<SimulatedPath> {
        let raw = compound_path(last.close, predictions, self.cfg.horizon)?;
        let smoothed = smooth_path(&raw, self.cfg.smoothing_window)?;
        let dates = business_days_from(last.date, raw.len());
        tracing::info!(
            horizon = self.cfg.horizon,
            start = last.close,
            end_raw = raw.last().copied().unwrap_or(last.close),
            end_smoothed = smoothed.last().copied().unwrap_or(last.close),
            "Price path simulated"
        );
        Ok(SimulatedPath {
            dates,
            raw,
            smoothed,
        })
    }
}
