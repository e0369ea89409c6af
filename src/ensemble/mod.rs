pub mod folds;
pub mod forest;
pub mod params;
pub mod search;

pub use folds::{contiguous_folds, Fold};
pub use forest::TrainedModel;
pub use params::{HyperparameterSet, MaxDepth, MaxFeatures, SearchSpace};
pub use search::{
    evaluate_fold, evaluate_trial, EarlyStopping, EnsembleTrainer, FoldResult, SearchConfig,
    SearchOutcome, TrainingOutcome, TrialResult,
};
