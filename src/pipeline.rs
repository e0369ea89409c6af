use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::arima::{fit_auto, ArimaConfig, ArimaFit, ArimaOrder};
use crate::cleaner::remove_outliers;
use crate::ensemble::{
    EnsembleTrainer, HyperparameterSet, SearchConfig, SearchSpace, TrainingOutcome, TrialResult,
};
use crate::error::{ForecastError, Result};
use crate::features::{build_features, FeatureSet};
use crate::metrics::RegressionMetrics;
use crate::model::price::PriceSeries;
use crate::returns::log_returns;
use crate::simulator::{SimulatedPath, Simulator, SimulatorConfig, DEFAULT_HORIZON};
use crate::strategy::{StrategyEvaluation, StrategyEvaluator};
use crate::volatility::{VolatilityModel, VolatilityModelConfig};

/// Settings shared by every stage. `horizon` is both the feature matrix
/// length and the simulated path length.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub horizon: usize,
    pub volatility: VolatilityModelConfig,
    pub smoothing_window: usize,
    pub arima: ArimaConfig,
    pub space: SearchSpace,
    pub search: SearchConfig,
    pub strategy: StrategyEvaluator,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            volatility: VolatilityModelConfig::default(),
            smoothing_window: SimulatorConfig::default().smoothing_window,
            arima: ArimaConfig::default(),
            space: SearchSpace::default(),
            search: SearchConfig::default(),
            strategy: StrategyEvaluator::default(),
        }
    }
}

fn config_err(msg: String) -> ForecastError {
    ForecastError::Config(msg)
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon < 2 {
            return Err(config_err(format!("horizon must be >= 2, got {}", self.horizon)));
        }
        if self.volatility.window == 0 || self.smoothing_window == 0 {
            return Err(config_err("smoothing windows must be > 0".to_string()));
        }
        if self.search.n_trials == 0 {
            return Err(config_err("n_trials must be > 0".to_string()));
        }
        if self.search.patience == 0 {
            return Err(config_err("patience must be > 0".to_string()));
        }
        if self.search.n_folds < 2 || self.search.n_folds > self.horizon {
            return Err(config_err(format!(
                "n_folds must be in 2..={} (horizon), got {}",
                self.horizon, self.search.n_folds
            )));
        }
        if self.strategy.signal_days > self.horizon - 1 {
            return Err(config_err(format!(
                "signal_days {} exceeds simulated deltas {}",
                self.strategy.signal_days,
                self.horizon - 1
            )));
        }
        if self.strategy.thresholds.buy < self.strategy.thresholds.sell {
            return Err(config_err(format!(
                "buy threshold {} is below sell threshold {}",
                self.strategy.thresholds.buy, self.strategy.thresholds.sell
            )));
        }
        if self.space.is_empty() {
            return Err(ForecastError::EmptySearchSpace);
        }
        Ok(())
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            horizon: self.horizon,
            smoothing_window: self.smoothing_window,
        }
    }
}

/// Every intermediate product of one run.
#[derive(Debug)]
pub struct PipelineRun {
    pub cleaned: PriceSeries,
    pub returns: Vec<f64>,
    pub trend: ArimaFit,
    pub volatility: Vec<f64>,
    pub features: FeatureSet,
    pub training: TrainingOutcome,
    pub path: SimulatedPath,
    pub evaluation: StrategyEvaluation,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    pub fn run_stages(&self, prices: &PriceSeries) -> Result<PipelineRun> {
        let cfg = &self.cfg;
        let cleaned = remove_outliers(prices);
        if cleaned.len() < 2 {
            return Err(ForecastError::InsufficientData {
                stage: "cleaning",
                needed: 2,
                available: cleaned.len(),
            });
        }
        let returns = log_returns(&cleaned)?;
        let trend = fit_auto(&returns, &cfg.arima)?;
        let volatility = VolatilityModel::new(cfg.volatility).fit(&trend.residuals)?;
        let features = build_features(&trend.residuals, &volatility, &returns, cfg.horizon)?;

        let trainer = EnsembleTrainer::new(cfg.space.clone(), cfg.search);
        let training = trainer.train(&features)?;

        // Anchored on the last observed close even when cleaning dropped it,
        // so the path always starts at the end of the real history.
        let last = *prices.last().ok_or(ForecastError::InsufficientData {
            stage: "simulation",
            needed: 1,
            available: 0,
        })?;
        // In-sample predictions drive the simulation, so fit quality and
        // forecast quality are not separated here.
        let path = Simulator::new(cfg.simulator())
            .run(&training.in_sample_predictions, &last)?;

        let oof = training.search.best().out_of_fold_predictions();
        let evaluation = cfg
            .strategy
            .evaluate(&path.smoothed, &path.dates, features.target(), &oof);

        Ok(PipelineRun {
            cleaned,
            returns,
            trend,
            volatility,
            features,
            training,
            path,
            evaluation,
        })
    }

    pub fn run(&self, symbol: &str, prices: &PriceSeries) -> Result<ForecastReport> {
        tracing::info!(
            symbol,
            points = prices.len(),
            horizon = self.cfg.horizon,
            "Pipeline started"
        );
        let run = self.run_stages(prices)?;
        let report = ForecastReport::new(symbol, prices, &run, &self.cfg);
        tracing::info!(
            symbol,
            run_id = %report.run_id,
            best_trial = report.best_trial,
            "Pipeline finished"
        );
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Historical,
    Predicted,
}

/// One entry of the combined series. The first predicted point is the
/// simulation anchor, so it repeats the date and close of the last
/// historical point.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: PointKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub intercept: f64,
    pub sigma2: f64,
    pub aicc: f64,
}

/// Structured output handed to reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub observations: usize,
    pub outliers_removed: usize,
    pub trend: TrendSummary,
    pub volatility_window: usize,
    pub feature_rows: usize,
    pub best_trial: usize,
    pub best_params: HyperparameterSet,
    pub stopped_early: bool,
    pub trials: Vec<TrialResult>,
    /// Metrics of the final model on its own training rows.
    pub in_sample: RegressionMetrics,
    pub series: Vec<CombinedPoint>,
    #[serde(flatten)]
    pub strategy: StrategyEvaluation,
}

impl ForecastReport {
    pub fn new(
        symbol: &str,
        original: &PriceSeries,
        run: &PipelineRun,
        cfg: &PipelineConfig,
    ) -> Self {
        let best = run.training.search.best();
        let mut series: Vec<CombinedPoint> = original
            .points()
            .iter()
            .map(|p| CombinedPoint {
                date: p.date,
                price: p.close,
                kind: PointKind::Historical,
            })
            .collect();
        series.extend(
            run.path
                .dates
                .iter()
                .zip(&run.path.smoothed)
                .map(|(date, price)| CombinedPoint {
                    date: *date,
                    price: *price,
                    kind: PointKind::Predicted,
                }),
        );

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            symbol: symbol.to_string(),
            observations: original.len(),
            outliers_removed: original.len() - run.cleaned.len(),
            trend: TrendSummary {
                order: run.trend.order,
                ar: run.trend.ar.clone(),
                ma: run.trend.ma.clone(),
                intercept: run.trend.intercept,
                sigma2: run.trend.sigma2,
                aicc: run.trend.aicc,
            },
            volatility_window: cfg.volatility.window,
            feature_rows: run.features.len(),
            best_trial: best.trial,
            best_params: best.params,
            stopped_early: run.training.search.stopped_early,
            trials: run.training.search.trials.clone(),
            in_sample: run.training.in_sample,
            series,
            strategy: run.evaluation.clone(),
        }
    }

    pub fn predicted(&self) -> impl Iterator<Item = &CombinedPoint> {
        self.series.iter().filter(|p| p.kind == PointKind::Predicted)
    }
}
