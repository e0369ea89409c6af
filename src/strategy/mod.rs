pub mod evaluator;

pub use evaluator::{
    actual_signal, directional_accuracy, first_differences, sharpe_ratio, upcoming_signals,
    DatedSignal, SignalThresholds, StrategyEvaluation, StrategyEvaluator,
};
