use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    /// Squared Pearson correlation; `None` when either side has no variance.
    pub r2: Option<f64>,
    pub mae: f64,
}

impl RegressionMetrics {
    /// `None` for empty or mismatched inputs.
    pub fn from_pairs(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        let n = actual.len();
        if n == 0 || n != predicted.len() {
            return None;
        }
        let nf = n as f64;
        let mut sse = 0.0;
        let mut sum_abs = 0.0;
        for (y, yhat) in actual.iter().zip(predicted) {
            let err = y - yhat;
            sse += err * err;
            sum_abs += err.abs();
        }
        Some(Self {
            rmse: (sse / nf).sqrt(),
            r2: squared_correlation(actual, predicted),
            mae: sum_abs / nf,
        })
    }
}

pub fn squared_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len();
    if n < 2 || n != b.len() {
        return None;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 1e-18 || var_b <= 1e-18 {
        return None;
    }
    Some((cov * cov) / (var_a * var_b))
}

/// Mean of the defined values, `None` if there are none.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(var.max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_have_zero_error_and_unit_r2() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let m = RegressionMetrics::from_pairs(&y, &y).unwrap();
        assert!(m.rmse.abs() < 1e-12);
        assert!(m.mae.abs() < 1e-12);
        assert!((m.r2.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn r2_is_squared_pearson_not_coefficient_of_determination() {
        // Perfectly anti-correlated: squared correlation is still 1.
        let y = [1.0, 2.0, 3.0];
        let p = [3.0, 2.0, 1.0];
        let m = RegressionMetrics::from_pairs(&y, &p).unwrap();
        assert!((m.r2.unwrap() - 1.0).abs() < 1e-12);
        assert!((m.mae - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_predictions_leave_r2_undefined() {
        let m = RegressionMetrics::from_pairs(&[1.0, 2.0], &[0.5, 0.5]).unwrap();
        assert_eq!(m.r2, None);
    }

    #[test]
    fn mean_defined_skips_missing_values() {
        assert_eq!(mean_defined([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_defined([None, None]), None);
    }
}
