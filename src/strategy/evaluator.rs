use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ForecastError, Result};
use crate::metrics::{mean, sample_std};
use crate::model::signal::Signal;
use crate::returns::simple_returns;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_SIGNAL_DAYS: usize = 30;

/// Asymmetric bands for classifying predicted price deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalThresholds {
    pub buy: f64,
    pub sell: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy: 0.05,
            sell: -0.05,
        }
    }
}

impl SignalThresholds {
    pub fn classify(&self, delta: f64) -> Signal {
        if delta > self.buy {
            Signal::Buy
        } else if delta < self.sell {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

/// Sign of an observed delta; exactly zero is a hold.
pub fn actual_signal(delta: f64) -> Signal {
    if delta > 0.0 {
        Signal::Buy
    } else if delta < 0.0 {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Percentage (0-100) of positions where the predicted signal matches the
/// actual one, over the overlapping length of the two difference series.
pub fn directional_accuracy(
    actual: &[f64],
    predicted: &[f64],
    thresholds: SignalThresholds,
) -> Option<f64> {
    let actual_diff = first_differences(actual);
    let predicted_diff = first_differences(predicted);
    let n = actual_diff.len().min(predicted_diff.len());
    if n == 0 {
        return None;
    }
    let hits = actual_diff
        .iter()
        .zip(&predicted_diff)
        .filter(|(a, p)| actual_signal(**a) == thresholds.classify(**p))
        .count();
    Some(hits as f64 / n as f64 * 100.0)
}

/// `mean / stdev * sqrt(252)`. Zero dispersion is `UndefinedMetric`.
pub fn sharpe_ratio(returns: &[f64]) -> Result<f64> {
    let (Some(m), Some(sd)) = (mean(returns), sample_std(returns)) else {
        return Err(ForecastError::UndefinedMetric(format!(
            "sharpe ratio needs at least 2 returns, got {}",
            returns.len()
        )));
    };
    if sd <= f64::EPSILON {
        return Err(ForecastError::UndefinedMetric(
            "sharpe ratio: zero standard deviation".to_string(),
        ));
    }
    Ok(m / sd * TRADING_DAYS_PER_YEAR.sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatedSignal {
    pub date: NaiveDate,
    pub delta: f64,
    pub signal: Signal,
}

/// Classifies the first `days` deltas of `path`; delta `i` is dated `dates[i + 1]`.
pub fn upcoming_signals(
    path: &[f64],
    dates: &[NaiveDate],
    days: usize,
    thresholds: SignalThresholds,
) -> Vec<DatedSignal> {
    first_differences(path)
        .into_iter()
        .zip(dates.iter().skip(1))
        .take(days)
        .map(|(delta, date)| DatedSignal {
            date: *date,
            delta,
            signal: thresholds.classify(delta),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyEvaluation {
    /// `None` means undefined (e.g. a flat simulated path).
    pub sharpe_ratio: Option<f64>,
    pub directional_accuracy_pct: Option<f64>,
    pub next_signals: Vec<DatedSignal>,
}

#[derive(Debug, Clone, Copy)]
pub struct StrategyEvaluator {
    pub thresholds: SignalThresholds,
    pub signal_days: usize,
}

impl Default for StrategyEvaluator {
    fn default() -> Self {
        Self {
            thresholds: SignalThresholds::default(),
            signal_days: DEFAULT_SIGNAL_DAYS,
        }
    }
}

impl StrategyEvaluator {
    pub fn evaluate(
        &self,
        path: &[f64],
        dates: &[NaiveDate],
        validation_targets: &[f64],
        validation_predictions: &[f64],
    ) -> StrategyEvaluation {
        let sharpe = match sharpe_ratio(&simple_returns(path)) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "Sharpe ratio reported as undefined");
                None
            }
        };
        let accuracy =
            directional_accuracy(validation_targets, validation_predictions, self.thresholds);
        if accuracy.is_none() {
            tracing::warn!("Directional accuracy undefined: no overlapping deltas");
        }
        let next_signals = upcoming_signals(path, dates, self.signal_days, self.thresholds);
        tracing::info!(
            sharpe = ?sharpe,
            directional_accuracy_pct = ?accuracy,
            signals = next_signals.len(),
            "Strategy evaluated"
        );
        StrategyEvaluation {
            sharpe_ratio: sharpe,
            directional_accuracy_pct: accuracy,
            next_signals,
        }
    }
}
