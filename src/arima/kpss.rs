/// 5% critical value of the KPSS level-stationarity statistic.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// KPSS level-stationarity statistic with a Bartlett long-run variance.
///
/// Returns `None` for series shorter than 3 points or with zero variance;
/// callers treat those as stationary.
pub fn kpss_statistic(x: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = x.iter().sum::<f64>() / nf;
    let e: Vec<f64> = x.iter().map(|v| v - mean).collect();

    let mut partial = 0.0;
    let mut eta = 0.0;
    for v in &e {
        partial += v;
        eta += partial * partial;
    }
    eta /= nf * nf;

    let lags = (4.0 * (nf / 100.0).powf(0.25)).trunc() as usize;
    let mut s2 = e.iter().map(|v| v * v).sum::<f64>() / nf;
    for l in 1..=lags.min(n - 1) {
        let w = 1.0 - l as f64 / (lags as f64 + 1.0);
        let cov = (l..n).map(|t| e[t] * e[t - l]).sum::<f64>() / nf;
        s2 += 2.0 * w * cov;
    }
    if s2 <= 1e-300 || !s2.is_finite() {
        return None;
    }
    Some(eta / s2)
}

pub fn difference(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Smallest differencing order in `0..=max_d` whose series passes KPSS at 5%.
pub fn select_differencing(x: &[f64], max_d: usize) -> usize {
    let mut series = x.to_vec();
    let mut d = 0;
    while d < max_d {
        match kpss_statistic(&series) {
            Some(stat) if stat > KPSS_CRITICAL_5PCT => {
                series = difference(&series);
                d += 1;
            }
            _ => break,
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_needs_no_differencing() {
        assert_eq!(kpss_statistic(&[0.0; 50]), None);
        assert_eq!(select_differencing(&[0.0; 50], 2), 0);
    }

    #[test]
    fn linear_trend_is_differenced() {
        let x: Vec<f64> = (0..200).map(|i| i as f64 * 0.5 + ((i * 7) % 5) as f64).collect();
        assert!(kpss_statistic(&x).unwrap() > KPSS_CRITICAL_5PCT);
        assert!(select_differencing(&x, 2) >= 1);
    }

    #[test]
    fn alternating_noise_is_stationary() {
        let x: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(select_differencing(&x, 2), 0);
    }
}
