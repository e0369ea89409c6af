/// Exponential Moving Average with `alpha = 2 / (period + 1)`.
///
/// Seeded with the first observation itself, so `v[0] = x[0]` and
/// `v[t] = alpha * x[t] + (1 - alpha) * v[t - 1]` afterwards. Output length
/// always equals input length; `min_periods` only controls how many leading
/// values are reported as missing while the recursion still runs from `x[0]`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    min_periods: usize,
    ema: Option<f64>,
    count: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self::with_min_periods(period, 1)
    }

    pub fn with_min_periods(period: usize, min_periods: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            min_periods: min_periods.max(1),
            ema: None,
            count: 0,
        }
    }

    /// Push a new value, return the current EMA once `min_periods` values were seen.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let next = match self.ema {
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
            None => value,
        };
        self.ema = Some(next);
        self.count += 1;
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.is_ready() {
            self.ema
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.count >= self.min_periods
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// Full-length EMA of `values` (no warm-up gap).
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut ema = Ema::new(period);
    values.iter().filter_map(|v| ema.push(*v)).collect()
}

/// EMA of `values` with the first `min_periods - 1` outputs reported as `None`.
pub fn ema_series_with_warmup(
    values: &[f64],
    period: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    let mut ema = Ema::with_min_periods(period, min_periods);
    values.iter().map(|v| ema.push(*v)).collect()
}
