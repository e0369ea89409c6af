use rayon::prelude::*;
use serde::Serialize;

use crate::ensemble::folds::{contiguous_folds, Fold};
use crate::ensemble::forest::TrainedModel;
use crate::ensemble::params::{HyperparameterSet, SearchSpace};
use crate::error::{ForecastError, Result};
use crate::features::FeatureSet;
use crate::metrics::{mean_defined, RegressionMetrics};
use crate::strategy::{directional_accuracy, SignalThresholds};

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub n_trials: usize,
    pub n_folds: usize,
    pub patience: usize,
    pub seed: u64,
    pub thresholds: SignalThresholds,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_trials: 10,
            n_folds: 25,
            patience: 3,
            seed: 42,
            thresholds: SignalThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoldResult {
    pub fold: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub train: RegressionMetrics,
    pub validation: RegressionMetrics,
    pub directional_accuracy_pct: Option<f64>,
    #[serde(skip)]
    pub validation_predictions: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialResult {
    pub trial: usize,
    pub params: HyperparameterSet,
    pub mean_rmse: f64,
    pub mean_r2: Option<f64>,
    pub mean_mae: f64,
    pub mean_directional_accuracy_pct: Option<f64>,
    pub folds: Vec<FoldResult>,
}

impl TrialResult {
    /// Validation predictions of every fold in fold order; one per row.
    pub fn out_of_fold_predictions(&self) -> Vec<f64> {
        self.folds
            .iter()
            .flat_map(|f| f.validation_predictions.iter().copied())
            .collect()
    }
}

/// Stops a trial loop after `patience` consecutive trials without a strictly
/// lower score. Ties keep the earlier trial.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: Option<(usize, f64)>,
    since_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience: patience.max(1),
            best: None,
            since_improvement: 0,
        }
    }

    /// Records `score` for `trial`; returns `true` when the loop must stop.
    pub fn observe(&mut self, trial: usize, score: f64) -> bool {
        let improved = match self.best {
            None => true,
            Some((_, best)) => score < best,
        };
        if improved {
            self.best = Some((trial, score));
            self.since_improvement = 0;
        } else {
            self.since_improvement += 1;
        }
        self.since_improvement >= self.patience
    }

    pub fn best_trial(&self) -> Option<usize> {
        self.best.map(|(t, _)| t)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.map(|(_, s)| s)
    }
}

fn metrics_or_degenerate(
    fold: &Fold,
    actual: &[f64],
    predicted: &[f64],
) -> Result<RegressionMetrics> {
    RegressionMetrics::from_pairs(actual, predicted).ok_or(ForecastError::DegenerateFold {
        fold: fold.index,
        train_rows: fold.train_rows(),
        validation_rows: fold.validation_rows(),
    })
}

pub fn evaluate_fold(
    features: &FeatureSet,
    fold: &Fold,
    params: HyperparameterSet,
    cfg: &SearchConfig,
) -> Result<FoldResult> {
    let (train_x, train_y) = features.select(&fold.train_indices());
    let (val_x, val_y) = features.select(&fold.validation_indices());
    if train_x.is_empty() || val_x.is_empty() {
        return Err(ForecastError::DegenerateFold {
            fold: fold.index,
            train_rows: train_x.len(),
            validation_rows: val_x.len(),
        });
    }

    let model = TrainedModel::fit(&train_x, &train_y, params, cfg.seed)?;
    let train_pred = model.predict(&train_x)?;
    let val_pred = model.predict(&val_x)?;
    let train = metrics_or_degenerate(fold, &train_y, &train_pred)?;
    let validation = metrics_or_degenerate(fold, &val_y, &val_pred)?;
    let accuracy = directional_accuracy(&val_y, &val_pred, cfg.thresholds);

    tracing::debug!(
        fold = fold.index,
        train_rmse = train.rmse,
        val_rmse = validation.rmse,
        "Fold evaluated"
    );
    Ok(FoldResult {
        fold: fold.index,
        train_rows: train_x.len(),
        validation_rows: val_x.len(),
        train,
        validation,
        directional_accuracy_pct: accuracy,
        validation_predictions: val_pred,
    })
}

/// Folds run in parallel; results are collected in fold order so the
/// aggregates do not depend on scheduling.
pub fn evaluate_trial(
    features: &FeatureSet,
    folds: &[Fold],
    trial: usize,
    params: HyperparameterSet,
    cfg: &SearchConfig,
) -> Result<TrialResult> {
    let results: Vec<FoldResult> = folds
        .par_iter()
        .map(|fold| evaluate_fold(features, fold, params, cfg))
        .collect::<Result<Vec<_>>>()?;

    let n = results.len().max(1) as f64;
    let mean_rmse = results.iter().map(|f| f.validation.rmse).sum::<f64>() / n;
    let mean_mae = results.iter().map(|f| f.validation.mae).sum::<f64>() / n;
    let mean_r2 = mean_defined(results.iter().map(|f| f.validation.r2));
    let mean_accuracy = mean_defined(results.iter().map(|f| f.directional_accuracy_pct));

    tracing::info!(
        trial,
        params = %params,
        mean_rmse,
        mean_r2 = ?mean_r2,
        mean_mae,
        "Trial evaluated"
    );
    Ok(TrialResult {
        trial,
        params,
        mean_rmse,
        mean_r2,
        mean_mae,
        mean_directional_accuracy_pct: mean_accuracy,
        folds: results,
    })
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub trials: Vec<TrialResult>,
    pub best_index: usize,
    pub stopped_early: bool,
}

impl SearchOutcome {
    pub fn best(&self) -> &TrialResult {
        &self.trials[self.best_index]
    }
}

#[derive(Debug)]
pub struct TrainingOutcome {
    pub search: SearchOutcome,
    pub model: TrainedModel,
    /// Predictions of the final model on the rows it was fitted on.
    pub in_sample_predictions: Vec<f64>,
    /// Fit quality on the training rows themselves, not a generalization estimate.
    pub in_sample: RegressionMetrics,
}

/// Randomized hyperparameter search with K-fold selection and early stopping,
/// followed by a refit of the winner on every row.
#[derive(Debug, Clone)]
pub struct EnsembleTrainer {
    space: SearchSpace,
    cfg: SearchConfig,
}

impl EnsembleTrainer {
    pub fn new(space: SearchSpace, cfg: SearchConfig) -> Self {
        Self { space, cfg }
    }

    pub fn search(&self, features: &FeatureSet) -> Result<SearchOutcome> {
        if self.space.is_empty() {
            return Err(ForecastError::EmptySearchSpace);
        }
        let folds = contiguous_folds(features.len(), self.cfg.n_folds)?;
        let candidates = self.space.sample_trials(self.cfg.n_trials, self.cfg.seed)?;

        let mut stopper = EarlyStopping::new(self.cfg.patience);
        let mut trials = Vec::with_capacity(candidates.len());
        let mut stopped_early = false;
        for (index, params) in candidates.into_iter().enumerate() {
            let result = evaluate_trial(features, &folds, index, params, &self.cfg)?;
            let stop = stopper.observe(index, result.mean_rmse);
            trials.push(result);
            if stop {
                stopped_early = index + 1 < self.cfg.n_trials;
                tracing::info!(
                    trial = index,
                    best_trial = ?stopper.best_trial(),
                    patience = self.cfg.patience,
                    "Early stopping"
                );
                break;
            }
        }

        let Some(best_index) = stopper.best_trial() else {
            return Err(ForecastError::EmptySearchSpace);
        };
        Ok(SearchOutcome {
            trials,
            best_index,
            stopped_early,
        })
    }

    pub fn train(&self, features: &FeatureSet) -> Result<TrainingOutcome> {
        let search = self.search(features)?;
        let best = search.best();
        tracing::info!(
            trial = best.trial,
            params = %best.params,
            mean_rmse = best.mean_rmse,
            evaluated = search.trials.len(),
            "Best hyperparameters selected"
        );

        let model =
            TrainedModel::fit(features.rows(), features.target(), best.params, self.cfg.seed)?;
        let in_sample_predictions = model.predict(features.rows())?;
        let in_sample = RegressionMetrics::from_pairs(features.target(), &in_sample_predictions)
            .ok_or(ForecastError::InsufficientData {
                stage: "final fit",
                needed: 1,
                available: 0,
            })?;
        tracing::info!(
            params = %model.params(),
            rmse = in_sample.rmse,
            r2 = ?in_sample.r2,
            mae = in_sample.mae,
            "Final model refit on all rows (in-sample metrics)"
        );
        Ok(TrainingOutcome {
            search,
            model,
            in_sample_predictions,
            in_sample,
        })
    }
}
