use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Serializer};

use crate::error::{ForecastError, Result};

/// Tree depth limit; `Unbounded` grows until leaves are pure or too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxDepth {
    Limited(u16),
    Unbounded,
}

impl MaxDepth {
    pub fn limit(&self) -> Option<u16> {
        match self {
            MaxDepth::Limited(d) => Some(*d),
            MaxDepth::Unbounded => None,
        }
    }
}

impl Serialize for MaxDepth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MaxDepth::Limited(d) => serializer.serialize_u16(*d),
            MaxDepth::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

impl std::fmt::Display for MaxDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxDepth::Limited(d) => write!(f, "{}", d),
            MaxDepth::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    /// All features (regression forest convention).
    Auto,
    Sqrt,
    Log2,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features.max(1);
        let m = match self {
            MaxFeatures::Auto => n,
            MaxFeatures::Sqrt => (n as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n as f64).log2().floor() as usize,
        };
        m.clamp(1, n)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaxFeatures::Auto => "auto",
            MaxFeatures::Sqrt => "sqrt",
            MaxFeatures::Log2 => "log2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HyperparameterSet {
    pub tree_count: usize,
    pub max_depth: MaxDepth,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl std::fmt::Display for HyperparameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "trees={} depth={} split={} leaf={} features={}",
            self.tree_count,
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
            self.max_features.as_str()
        )
    }
}

/// Discrete candidate values per hyperparameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpace {
    pub tree_counts: Vec<usize>,
    pub max_depths: Vec<MaxDepth>,
    pub min_samples_splits: Vec<usize>,
    pub min_samples_leaves: Vec<usize>,
    pub max_features: Vec<MaxFeatures>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            tree_counts: vec![50, 100, 150],
            max_depths: vec![
                MaxDepth::Limited(10),
                MaxDepth::Limited(20),
                MaxDepth::Limited(30),
                MaxDepth::Unbounded,
            ],
            min_samples_splits: vec![2, 5, 10],
            min_samples_leaves: vec![1, 2, 4],
            max_features: vec![MaxFeatures::Auto, MaxFeatures::Sqrt, MaxFeatures::Log2],
        }
    }
}

impl SearchSpace {
    pub fn is_empty(&self) -> bool {
        self.tree_counts.is_empty()
            || self.max_depths.is_empty()
            || self.min_samples_splits.is_empty()
            || self.min_samples_leaves.is_empty()
            || self.max_features.is_empty()
    }

    /// Number of distinct combinations in the grid.
    pub fn size(&self) -> usize {
        self.tree_counts.len()
            * self.max_depths.len()
            * self.min_samples_splits.len()
            * self.min_samples_leaves.len()
            * self.max_features.len()
    }

    pub fn contains(&self, params: &HyperparameterSet) -> bool {
        self.tree_counts.contains(&params.tree_count)
            && self.max_depths.contains(&params.max_depth)
            && self.min_samples_splits.contains(&params.min_samples_split)
            && self.min_samples_leaves.contains(&params.min_samples_leaf)
            && self.max_features.contains(&params.max_features)
    }

    /// Draws one value per hyperparameter, independently and uniformly.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<HyperparameterSet> {
        let (
            Some(tree_count),
            Some(max_depth),
            Some(min_samples_split),
            Some(min_samples_leaf),
            Some(max_features),
        ) = (
            self.tree_counts.choose(rng),
            self.max_depths.choose(rng),
            self.min_samples_splits.choose(rng),
            self.min_samples_leaves.choose(rng),
            self.max_features.choose(rng),
        ) else {
            return Err(ForecastError::EmptySearchSpace);
        };
        Ok(HyperparameterSet {
            tree_count: *tree_count,
            max_depth: *max_depth,
            min_samples_split: *min_samples_split,
            min_samples_leaf: *min_samples_leaf,
            max_features: *max_features,
        })
    }

    /// All trial configurations for a run, drawn up front from `seed`.
    ///
    /// Sampling is with replacement: the same set may appear twice and most of
    /// the grid is never visited.
    pub fn sample_trials(&self, n_trials: usize, seed: u64) -> Result<Vec<HyperparameterSet>> {
        if self.is_empty() {
            return Err(ForecastError::EmptySearchSpace);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n_trials).map(|_| self.sample(&mut rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_features_resolution_for_two_features() {
        assert_eq!(MaxFeatures::Auto.resolve(2), 2);
        assert_eq!(MaxFeatures::Sqrt.resolve(2), 1);
        assert_eq!(MaxFeatures::Log2.resolve(2), 1);
        assert_eq!(MaxFeatures::Sqrt.resolve(9), 3);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
    }

    #[test]
    fn default_grid_has_324_combinations() {
        assert_eq!(SearchSpace::default().size(), 324);
    }

    #[test]
    fn unbounded_depth_serializes_as_label() {
        let v = serde_json::to_value(MaxDepth::Unbounded).unwrap();
        assert_eq!(v, serde_json::json!("unbounded"));
        let v = serde_json::to_value(MaxDepth::Limited(10)).unwrap();
        assert_eq!(v, serde_json::json!(10));
    }
}
