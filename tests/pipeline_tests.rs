use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sandbox_forecast::arima::{fit_auto, ArimaConfig};
use sandbox_forecast::cleaner::remove_outliers;
use sandbox_forecast::returns::log_returns;
use sandbox_forecast::simulator::{Simulator, SimulatorConfig};
use sandbox_forecast::strategy::StrategyEvaluator;
use sandbox_forecast::volatility::{VolatilityModel, VolatilityModelConfig};
use sandbox_forecast::ensemble::{MaxDepth, MaxFeatures, SearchConfig, SearchSpace};
use sandbox_forecast::error::ForecastError;
use sandbox_forecast::model::price::PriceSeries;
use sandbox_forecast::pipeline::{Pipeline, PipelineConfig, PointKind};

fn synthetic_prices(n: usize, seed: u64) -> PriceSeries {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let closes: Vec<f64> = (0..n)
        .map(|t| {
            let t = t as f64;
            let noise: f64 = rng.gen_range(-0.005..0.005);
            let seasonal = 0.02 * (2.0 * std::f64::consts::PI * t / 20.0).sin();
            100.0 * (0.0005 * t + seasonal + noise).exp()
        })
        .collect();
    PriceSeries::from_closes(NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(), &closes).unwrap()
}

fn quick_config() -> PipelineConfig {
    PipelineConfig {
        arima: ArimaConfig {
            max_p: 2,
            max_q: 2,
            max_order: 2,
            ..ArimaConfig::default()
        },
        space: SearchSpace {
            tree_counts: vec![10, 20],
            max_depths: vec![MaxDepth::Limited(5), MaxDepth::Unbounded],
            min_samples_splits: vec![2, 5],
            min_samples_leaves: vec![1, 2],
            max_features: vec![MaxFeatures::Auto, MaxFeatures::Sqrt, MaxFeatures::Log2],
        },
        search: SearchConfig {
            n_trials: 3,
            n_folds: 5,
            patience: 2,
            seed: 42,
            ..SearchConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn end_to_end_report_has_full_forecast() {
    let cfg = quick_config();
    let space = cfg.space.clone();
    let prices = synthetic_prices(400, 1);
    let pipeline = Pipeline::new(cfg).unwrap();

    let run = pipeline.run_stages(&prices).unwrap();
    assert_eq!(run.features.len(), 365);
    assert_eq!(run.training.in_sample_predictions.len(), 365);
    assert!(space.contains(&run.training.search.best().params));
    assert_eq!(run.volatility.len(), run.trend.residuals.len());

    let report = pipeline.run("TEST", &prices).unwrap();
    assert_eq!(report.feature_rows, 365);
    assert_eq!(report.observations, 400);
    let predicted: Vec<_> = report.predicted().collect();
    assert_eq!(predicted.len(), 365);
    assert!(predicted.iter().all(|p| p.price.is_finite() && p.price > 0.0));
    assert_eq!(
        report.series.iter().filter(|p| p.kind == PointKind::Historical).count(),
        400
    );
    assert_eq!(report.strategy.next_signals.len(), 30);
    if let Some(acc) = report.strategy.directional_accuracy_pct {
        assert!((0.0..=100.0).contains(&acc));
    }

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("sharpe_ratio").is_some());
    assert!(json.get("next_signals").is_some());
    assert_eq!(json["symbol"], "TEST");
}

#[test]
fn same_seed_gives_same_selection() {
    let prices = synthetic_prices(400, 5);
    let a = Pipeline::new(quick_config()).unwrap().run_stages(&prices).unwrap();
    let b = Pipeline::new(quick_config()).unwrap().run_stages(&prices).unwrap();
    assert_eq!(a.training.search.best().params, b.training.search.best().params);
    assert_eq!(a.trend.order, b.trend.order);
    assert_eq!(a.path.smoothed, b.path.smoothed);
}

#[test]
fn short_history_is_rejected_before_training() {
    let prices = synthetic_prices(120, 2);
    let err = Pipeline::new(quick_config())
        .unwrap()
        .run_stages(&prices)
        .unwrap_err();
    assert!(matches!(err, ForecastError::InsufficientHistory { needed: 365, .. }));
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let mut cfg = quick_config();
    cfg.search.n_folds = 1;
    assert!(matches!(Pipeline::new(cfg), Err(ForecastError::Config(_))));

    let mut cfg = quick_config();
    cfg.space.tree_counts.clear();
    assert!(matches!(Pipeline::new(cfg), Err(ForecastError::EmptySearchSpace)));

    let mut cfg = quick_config();
    cfg.strategy.thresholds.buy = -0.1;
    assert!(Pipeline::new(cfg).is_err());
}

#[test]
fn constant_prices_fit_and_leave_sharpe_undefined() {
    let prices = PriceSeries::from_closes(
        NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
        &vec![50.0; 400],
    )
    .unwrap();
    let cleaned = remove_outliers(&prices);
    assert_eq!(cleaned.len(), 400);

    let returns = log_returns(&cleaned).unwrap();
    assert!(returns.iter().all(|r| *r == 0.0));
    let trend = fit_auto(&returns, &ArimaConfig::default()).unwrap();
    let vol = VolatilityModel::new(VolatilityModelConfig::default())
        .fit(&trend.residuals)
        .unwrap();
    assert!(vol.iter().all(|v| *v >= 0.0 && v.is_finite()));

    let path = Simulator::new(SimulatorConfig::default())
        .run(&vec![0.0; 364], cleaned.last().unwrap())
        .unwrap();
    let eval = StrategyEvaluator::default().evaluate(&path.smoothed, &path.dates, &[], &[]);
    assert_eq!(eval.sharpe_ratio, None);
    assert_eq!(eval.directional_accuracy_pct, None);
}

#[test]
fn forecast_starts_at_last_observed_close_after_late_rally() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut closes: Vec<f64> = (0..420)
        .map(|_| 100.0 * (1.0 + rng.gen_range(-0.005..0.005)))
        .collect();
    let mut price = 100.0;
    for _ in 0..120 {
        price *= 1.01;
        closes.push(price);
    }
    let prices =
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), &closes).unwrap();
    let last = *prices.last().unwrap();

    let report = Pipeline::new(quick_config())
        .unwrap()
        .run("RALLY", &prices)
        .unwrap();
    // The rally sits outside the IQR fences, so cleaning drops the latest closes.
    assert!(report.outliers_removed > 0);

    let first = report.predicted().next().unwrap();
    assert_eq!(first.date, last.date);
    assert_eq!(first.price, last.close);
    assert!(report.predicted().all(|p| p.date >= last.date));
    assert!(report.strategy.next_signals.iter().all(|s| s.date > last.date));
}
