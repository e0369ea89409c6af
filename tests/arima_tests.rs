use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_forecast::arima::kpss::select_differencing;
use sandbox_forecast::arima::{fit_auto, fit_order, ArimaConfig, ArimaOrder};
use sandbox_forecast::error::ForecastError;

fn ar1(phi: f64, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(n);
    let mut prev = 0.0;
    for _ in 0..n {
        let e: f64 = rng.gen_range(-0.01..0.01);
        prev = phi * prev + e;
        x.push(prev);
    }
    x
}

#[test]
fn recovers_ar1_coefficient() {
    let x = ar1(0.6, 600, 7);
    let order = ArimaOrder { p: 1, d: 0, q: 0 };
    let fit = fit_order(&x, order, &ArimaConfig::default()).unwrap();
    assert_eq!(fit.ar.len(), 1);
    // Two coefficients (AR + intercept) plus the innovation variance.
    assert_eq!(fit.parameter_count(), 3);
    assert!((fit.ar[0] - 0.6).abs() < 0.15, "phi = {}", fit.ar[0]);
    assert!(fit.ar[0].abs() < 1.0);
    assert_eq!(fit.residuals.len(), x.len() - 1);
    assert!(fit.sigma2 > 0.0);
}

#[test]
fn auto_fit_stays_inside_the_grid() {
    let x = ar1(0.4, 300, 11);
    let cfg = ArimaConfig::default();
    let fit = fit_auto(&x, &cfg).unwrap();
    assert!(fit.order.p + fit.order.q <= cfg.max_order);
    assert!(fit.order.d <= cfg.max_d);
    assert!(fit.aicc.is_finite());
    assert_eq!(
        fit.residuals.len(),
        x.len() - fit.order.d - fit.order.p
    );
    assert!(fit.residuals.iter().all(|r| r.is_finite()));
}

#[test]
fn constant_returns_fit_without_convergence_error() {
    let x = vec![0.0; 60];
    assert_eq!(select_differencing(&x, 2), 0);
    let fit = fit_auto(&x, &ArimaConfig::default()).unwrap();
    assert_eq!(fit.order.d, 0);
    assert!(fit.sigma2 > 0.0);
    assert!(fit.residuals.iter().all(|r| r.abs() < 1e-6));
}

#[test]
fn too_few_observations_fail_fast() {
    let err = fit_auto(&[0.01; 10], &ArimaConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientData { needed: 30, available: 10, .. }
    ));
}

#[test]
fn differenced_fit_has_no_intercept() {
    let x: Vec<f64> = (0..120).map(|i| i as f64 * 0.01 + ((i * 13) % 7) as f64 * 0.001).collect();
    let order = ArimaOrder { p: 0, d: 1, q: 1 };
    let fit = fit_order(&x, order, &ArimaConfig::default()).unwrap();
    assert_eq!(fit.intercept, 0.0);
    assert_eq!(fit.residuals.len(), x.len() - 1);
    assert_eq!(fit.order.to_string(), "ARIMA(0,1,1)");
}

#[test]
fn forecast_extends_on_input_scale() {
    let x = ar1(0.5, 200, 3);
    let fit = fit_order(&x, ArimaOrder { p: 1, d: 0, q: 0 }, &ArimaConfig::default()).unwrap();
    let f = fit.forecast(10);
    assert_eq!(f.len(), 10);
    // A stationary AR(1) decays towards its mean.
    assert!((f[9] - fit.intercept).abs() <= (f[0] - fit.intercept).abs() + 1e-12);
}
