use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::ensemble::params::HyperparameterSet;
use crate::error::{ensure_finite, ForecastError, Result};
use crate::features::{FeatureRow, FEATURE_COUNT};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// A fitted random forest together with the hyperparameters it was built from.
pub struct TrainedModel {
    forest: Forest,
    params: HyperparameterSet,
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedModel")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn to_matrix(rows: &[FeatureRow]) -> Result<DenseMatrix<f64>> {
    let data: Vec<[f64; FEATURE_COUNT]> = rows.iter().map(FeatureRow::as_array).collect();
    let refs: Vec<&[f64]> = data.iter().map(|r| r.as_slice()).collect();
    DenseMatrix::from_2d_array(&refs)
        .map_err(|e| ForecastError::Model(format!("failed to build feature matrix: {}", e)))
}

fn forest_parameters(params: &HyperparameterSet, seed: u64) -> RandomForestRegressorParameters {
    let base = RandomForestRegressorParameters::default()
        .with_n_trees(params.tree_count)
        .with_min_samples_split(params.min_samples_split)
        .with_min_samples_leaf(params.min_samples_leaf)
        .with_m(params.max_features.resolve(FEATURE_COUNT))
        .with_seed(seed);
    match params.max_depth.limit() {
        Some(depth) => base.with_max_depth(depth),
        None => base,
    }
}

impl TrainedModel {
    pub fn fit(
        rows: &[FeatureRow],
        target: &[f64],
        params: HyperparameterSet,
        seed: u64,
    ) -> Result<Self> {
        if rows.is_empty() || rows.len() != target.len() {
            return Err(ForecastError::Model(format!(
                "cannot fit forest on {} rows with {} targets",
                rows.len(),
                target.len()
            )));
        }
        ensure_finite("ensemble target", target)?;
        let x = to_matrix(rows)?;
        let y = target.to_vec();
        let forest = Forest::fit(&x, &y, forest_parameters(&params, seed))
            .map_err(|e| ForecastError::Model(format!("random forest fit failed: {}", e)))?;
        Ok(Self { forest, params })
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let x = to_matrix(rows)?;
        let out = self
            .forest
            .predict(&x)
            .map_err(|e| ForecastError::Model(format!("random forest predict failed: {}", e)))?;
        ensure_finite("ensemble predictions", &out)?;
        Ok(out)
    }

    pub fn params(&self) -> &HyperparameterSet {
        &self.params
    }
}
