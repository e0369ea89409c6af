use crate::error::{ensure_finite, ForecastError, Result};
use crate::indicator::ema::Ema;

pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct VolatilityModelConfig {
    pub window: usize,
}

impl Default for VolatilityModelConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_VOLATILITY_WINDOW,
        }
    }
}

/// Exponentially smoothed absolute residuals. `v[0] = |r[0]|`.
#[derive(Debug, Clone)]
pub struct VolatilityModel {
    cfg: VolatilityModelConfig,
}

impl VolatilityModel {
    pub fn new(cfg: VolatilityModelConfig) -> Self {
        Self { cfg }
    }

    pub fn window(&self) -> usize {
        self.cfg.window
    }

    pub fn fit(&self, residuals: &[f64]) -> Result<Vec<f64>> {
        if self.window() == 0 {
            return Err(ForecastError::Config(
                "volatility window must be > 0".to_string(),
            ));
        }
        ensure_finite("volatility input", residuals)?;
        let mut ema = Ema::new(self.window());
        let out: Vec<f64> = residuals
            .iter()
            .filter_map(|r| ema.push(r.abs()))
            .collect();
        ensure_finite("volatility", &out)?;
        tracing::info!(
            window = ema.period(),
            alpha = ema.alpha(),
            len = out.len(),
            last = out.last().copied().unwrap_or(0.0),
            "Volatility series estimated"
        );
        Ok(out)
    }
}
