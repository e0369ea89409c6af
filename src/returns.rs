use crate::error::{ensure_finite, ForecastError, Result};
use crate::model::price::PriceSeries;

/// `ln(p[t]) - ln(p[t-1])` for every consecutive pair of closes.
pub fn log_returns(series: &PriceSeries) -> Result<Vec<f64>> {
    if series.len() < 2 {
        return Err(ForecastError::InsufficientData {
            stage: "log returns",
            needed: 2,
            available: series.len(),
        });
    }
    let out: Vec<f64> = series
        .points()
        .windows(2)
        .map(|w| w[1].close.ln() - w[0].close.ln())
        .collect();
    ensure_finite("log returns", &out)?;
    Ok(out)
}

/// Inverse of [`log_returns`]: `first * exp(cumsum(returns))`, prefixed by `first`.
pub fn compound_prices(first: f64, returns: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(returns.len() + 1);
    out.push(first);
    let mut acc = 0.0;
    for r in returns {
        acc += r;
        out.push(first * acc.exp());
    }
    out
}

/// Simple period returns `p[t] / p[t-1] - 1`, skipping non-positive bases.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > f64::EPSILON)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}
