use sandbox_forecast::error::ForecastError;
use sandbox_forecast::features::{build_features, FeatureRow, FeatureSet, TARGET_SCALE};

fn ramp(n: usize, scale: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 * scale).collect()
}

#[test]
fn builds_tail_aligned_rows() {
    let residuals = ramp(392, 0.001);
    let volatility = ramp(392, 0.002);
    let returns = ramp(399, 0.0001);

    let set = build_features(&residuals, &volatility, &returns, 365).unwrap();
    assert_eq!(set.len(), 365);
    assert_eq!(set.target().len(), 365);

    let first = set.rows()[0];
    assert_eq!(first.residual, residuals[392 - 365]);
    assert_eq!(first.volatility, volatility[392 - 365]);
    assert!((set.target()[0] - returns[399 - 365] * TARGET_SCALE).abs() < 1e-12);
    assert_eq!(set.rows()[364].residual, residuals[391]);
}

#[test]
fn short_residuals_are_insufficient_history() {
    let err = build_features(&ramp(300, 1.0), &ramp(400, 1.0), &ramp(400, 1.0), 365).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientHistory { series: "residuals", needed: 365, available: 300 }
    ));
}

#[test]
fn nan_in_window_is_rejected() {
    let mut vol = ramp(10, 1.0);
    vol[8] = f64::NAN;
    let err = build_features(&ramp(10, 1.0), &vol, &ramp(10, 1.0), 5).unwrap_err();
    assert!(matches!(err, ForecastError::NonFinite { .. }));
}

#[test]
fn select_keeps_requested_order() {
    let rows = (0..4)
        .map(|i| FeatureRow { residual: i as f64, volatility: 0.0 })
        .collect();
    let set = FeatureSet::new(rows, vec![10.0, 11.0, 12.0, 13.0]).unwrap();
    let (rows, target) = set.select(&[3, 0]);
    assert_eq!(rows[0].residual, 3.0);
    assert_eq!(target, vec![13.0, 10.0]);
}
