use serde::Serialize;

use crate::error::{ensure_finite, ForecastError, Result};

/// Returns are multiplied by this before regression and divided by it when compounding.
pub const TARGET_SCALE: f64 = 1000.0;
pub const FEATURE_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    pub residual: f64,
    pub volatility: f64,
}

impl FeatureRow {
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [self.residual, self.volatility]
    }
}

/// Tail-aligned feature rows and scaled return targets of identical length.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    rows: Vec<FeatureRow>,
    target: Vec<f64>,
}

impl FeatureSet {
    pub fn new(rows: Vec<FeatureRow>, target: Vec<f64>) -> Result<Self> {
        if rows.len() != target.len() {
            return Err(ForecastError::InvalidSeries(format!(
                "feature rows ({}) and targets ({}) differ in length",
                rows.len(),
                target.len()
            )));
        }
        for (index, row) in rows.iter().enumerate() {
            if !row.residual.is_finite() || !row.volatility.is_finite() {
                tracing::error!(stage = "feature matrix", index, "Non-finite value rejected");
                return Err(ForecastError::NonFinite {
                    stage: "feature matrix",
                    index,
                });
            }
        }
        ensure_finite("feature target", &target)?;
        Ok(Self { rows, target })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Rows and targets at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> (Vec<FeatureRow>, Vec<f64>) {
        let rows = indices.iter().map(|&i| self.rows[i]).collect();
        let target = indices.iter().map(|&i| self.target[i]).collect();
        (rows, target)
    }
}

fn tail<'a>(series: &'a [f64], name: &'static str, horizon: usize) -> Result<&'a [f64]> {
    if series.len() < horizon {
        return Err(ForecastError::InsufficientHistory {
            series: name,
            needed: horizon,
            available: series.len(),
        });
    }
    Ok(&series[series.len() - horizon..])
}

/// Aligns the three series on their most recent `horizon` points.
pub fn build_features(
    residuals: &[f64],
    volatility: &[f64],
    returns: &[f64],
    horizon: usize,
) -> Result<FeatureSet> {
    let res = tail(residuals, "residuals", horizon)?;
    let vol = tail(volatility, "volatility", horizon)?;
    let ret = tail(returns, "returns", horizon)?;
    ensure_finite("feature residuals", res)?;
    ensure_finite("feature volatility", vol)?;
    ensure_finite("feature returns", ret)?;

    let rows = res
        .iter()
        .zip(vol)
        .map(|(r, v)| FeatureRow {
            residual: *r,
            volatility: *v,
        })
        .collect();
    let target = ret.iter().map(|r| r * TARGET_SCALE).collect();
    let set = FeatureSet::new(rows, target)?;
    tracing::info!(rows = set.len(), horizon, "Feature matrix built");
    Ok(set)
}
