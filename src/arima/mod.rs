pub mod kpss;
pub mod optimizer;

use serde::Serialize;

use crate::error::{ensure_finite, ForecastError, Result};
use optimizer::{minimize, NelderMeadConfig};

pub const ARIMA_MIN_OBSERVATIONS: usize = 30;

/// Floor applied to the innovation variance so a perfect fit keeps a finite likelihood.
const SIGMA2_FLOOR: f64 = 1e-300;

#[derive(Debug, Clone, Copy)]
pub struct ArimaConfig {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    pub min_observations: usize,
    pub optimizer: NelderMeadConfig,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_d: 2,
            max_q: 5,
            max_order: 5,
            min_observations: ARIMA_MIN_OBSERVATIONS,
            optimizer: NelderMeadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// A fitted ARIMA(p, d, q) on log returns.
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub intercept: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aicc: f64,
    /// One-step-ahead in-sample residuals, length `n - d - p`.
    pub residuals: Vec<f64>,
    // Each differencing level of the input, level 0 is the input itself.
    levels: Vec<Vec<f64>>,
    // Residuals aligned with the differenced series (zeros for the first p).
    full_residuals: Vec<f64>,
}

impl ArimaFit {
    /// Out-of-sample point forecasts on the scale of the original input.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let Some(w) = self.levels.last() else {
            return Vec::new();
        };
        let p = self.order.p;
        let q = self.order.q;
        let mu = self.intercept;
        let mut hist = w.clone();
        let mut errs = self.full_residuals.clone();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            let t = hist.len();
            let mut pred = mu;
            for (i, phi) in self.ar.iter().enumerate().take(p) {
                if t > i {
                    pred += phi * (hist[t - 1 - i] - mu);
                }
            }
            for (j, theta) in self.ma.iter().enumerate().take(q) {
                if t > j {
                    pred += theta * errs[t - 1 - j];
                }
            }
            hist.push(pred);
            errs.push(0.0);
            out.push(pred);
        }

        // Undo differencing from the innermost level outwards.
        for level in self.levels.iter().rev().skip(1) {
            let mut last = level.last().copied().unwrap_or(0.0);
            for v in out.iter_mut() {
                last += *v;
                *v = last;
            }
        }
        out
    }

    pub fn parameter_count(&self) -> usize {
        parameter_count(self.order, self.order.d == 0)
    }
}

fn parameter_count(order: ArimaOrder, with_intercept: bool) -> usize {
    order.p + order.q + usize::from(with_intercept) + 1
}

/// Maps unconstrained values to coefficients of a stationary AR polynomial
/// `1 - a1 z - ... - ap z^p` via partial autocorrelations in (-1, 1).
pub fn pacf_to_ar(raw: &[f64]) -> Vec<f64> {
    let p = raw.len();
    let mut work: Vec<f64> = raw.iter().map(|v| v.tanh()).collect();
    let mut coeffs = work.clone();
    for j in 1..p {
        let a = coeffs[j];
        for k in 0..j {
            work[k] -= a * coeffs[j - k - 1];
        }
        coeffs[..j].copy_from_slice(&work[..j]);
    }
    coeffs
}

/// Same transform for an invertible MA polynomial `1 + b1 z + ... + bq z^q`.
pub fn pacf_to_ma(raw: &[f64]) -> Vec<f64> {
    pacf_to_ar(raw).into_iter().map(|v| -v).collect()
}

/// Conditional sum of squares; residuals before index `p` are zero.
fn css(w: &[f64], ar: &[f64], ma: &[f64], mu: f64) -> (f64, Vec<f64>) {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    let mut sse = 0.0;
    for t in p..w.len() {
        let mut pred = mu;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mu);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
        sse += e[t] * e[t];
    }
    (sse, e)
}

fn split_params(
    theta: &[f64],
    order: ArimaOrder,
    with_intercept: bool,
    fallback_mu: f64,
) -> (Vec<f64>, Vec<f64>, f64) {
    let ar = pacf_to_ar(&theta[..order.p]);
    let ma = pacf_to_ma(&theta[order.p..order.p + order.q]);
    let mu = if with_intercept {
        theta[order.p + order.q]
    } else {
        fallback_mu
    };
    (ar, ma, mu)
}

/// Fits a fixed order by conditional maximum likelihood.
pub fn fit_order(series: &[f64], order: ArimaOrder, cfg: &ArimaConfig) -> Result<ArimaFit> {
    ensure_finite("trend model input", series)?;
    if series.len() < cfg.min_observations {
        return Err(ForecastError::InsufficientData {
            stage: "trend model",
            needed: cfg.min_observations,
            available: series.len(),
        });
    }

    let mut levels = vec![series.to_vec()];
    for _ in 0..order.d {
        let next = kpss::difference(levels.last().map(Vec::as_slice).unwrap_or(&[]));
        levels.push(next);
    }
    let w = levels.last().cloned().unwrap_or_default();
    let with_intercept = order.d == 0;
    let n_eff = w.len().saturating_sub(order.p);
    let k = parameter_count(order, with_intercept);
    if n_eff <= k + 1 {
        return Err(ForecastError::InsufficientData {
            stage: "trend model",
            needed: k + 2 + order.p + order.d,
            available: series.len(),
        });
    }

    let mean = w.iter().sum::<f64>() / w.len() as f64;
    let sd = (w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / w.len() as f64).sqrt();
    let mut x0 = vec![0.0; order.p + order.q];
    let mut steps = vec![0.1; order.p + order.q];
    if with_intercept {
        x0.push(mean);
        steps.push(if sd > 0.0 { 0.1 * sd } else { 1e-3 });
    }

    let fallback_mu = 0.0;
    let min = minimize(
        |theta| {
            let (ar, ma, mu) = split_params(theta, order, with_intercept, fallback_mu);
            css(&w, &ar, &ma, mu).0
        },
        &x0,
        &steps,
        cfg.optimizer,
    );
    if !min.converged || !min.f.is_finite() {
        return Err(ForecastError::Convergence(format!(
            "{} did not converge after {} iterations (objective {})",
            order, min.iterations, min.f
        )));
    }

    let (ar, ma, intercept) = split_params(&min.x, order, with_intercept, fallback_mu);
    let (sse, full_residuals) = css(&w, &ar, &ma, intercept);
    let nf = n_eff as f64;
    let sigma2 = (sse / nf).max(SIGMA2_FLOOR);
    let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    let kf = k as f64;
    let aicc = -2.0 * log_likelihood + 2.0 * kf + 2.0 * kf * (kf + 1.0) / (nf - kf - 1.0);
    let residuals = full_residuals[order.p..].to_vec();
    ensure_finite("trend residuals", &residuals)?;
    if !aicc.is_finite() {
        return Err(ForecastError::Convergence(format!(
            "{} produced a non-finite information criterion",
            order
        )));
    }

    tracing::debug!(
        order = %order,
        iterations = min.iterations,
        sigma2,
        aicc,
        "Candidate trend model fitted"
    );

    Ok(ArimaFit {
        order,
        ar,
        ma,
        intercept,
        sigma2,
        log_likelihood,
        aicc,
        residuals,
        levels,
        full_residuals,
    })
}

/// Chooses `d` by KPSS, then `(p, q)` by AICc over the bounded grid.
///
/// Candidates that fail to converge are skipped; if none converges the run
/// must abort, there is no default order to fall back to.
pub fn fit_auto(returns: &[f64], cfg: &ArimaConfig) -> Result<ArimaFit> {
    ensure_finite("trend model input", returns)?;
    if returns.len() < cfg.min_observations {
        return Err(ForecastError::InsufficientData {
            stage: "trend model",
            needed: cfg.min_observations,
            available: returns.len(),
        });
    }
    let d = kpss::select_differencing(returns, cfg.max_d);

    let mut best: Option<ArimaFit> = None;
    let mut tried = 0usize;
    let mut failed = 0usize;
    for p in 0..=cfg.max_p {
        for q in 0..=cfg.max_q {
            if p + q > cfg.max_order {
                continue;
            }
            tried += 1;
            let order = ArimaOrder { p, d, q };
            match fit_order(returns, order, cfg) {
                Ok(fit) => {
                    let better = best.as_ref().map_or(true, |b| fit.aicc < b.aicc);
                    if better {
                        best = Some(fit);
                    }
                }
                Err(ForecastError::Convergence(msg)) => {
                    failed += 1;
                    tracing::debug!(order = %order, reason = %msg, "Candidate skipped");
                }
                Err(ForecastError::InsufficientData { .. }) => {
                    failed += 1;
                    tracing::debug!(order = %order, "Candidate skipped: too few observations");
                }
                Err(e) => return Err(e),
            }
        }
    }

    let Some(fit) = best else {
        return Err(ForecastError::Convergence(format!(
            "none of {} candidate orders with d={} converged",
            tried, d
        )));
    };
    tracing::info!(
        order = %fit.order,
        aicc = fit.aicc,
        sigma2 = fit.sigma2,
        parameters = fit.parameter_count(),
        candidates = tried,
        failed,
        residuals = fit.residuals.len(),
        "Trend model selected"
    );
    Ok(fit)
}
