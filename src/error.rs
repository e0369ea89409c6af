use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("data unavailable for {symbol} after {attempts} attempts: {last_error}")]
    DataUnavailable {
        symbol: String,
        attempts: u32,
        last_error: String,
    },

    #[error("insufficient data in {stage}: need {needed}, have {available}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("insufficient history in {series}: need {needed} points, have {available}")]
    InsufficientHistory {
        series: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("trend model did not converge: {0}")]
    Convergence(String),

    #[error("hyperparameter search space is empty")]
    EmptySearchSpace,

    #[error("degenerate fold {fold}: {train_rows} train rows, {validation_rows} validation rows")]
    DegenerateFold {
        fold: usize,
        train_rows: usize,
        validation_rows: usize,
    },

    #[error("metric undefined: {0}")]
    UndefinedMetric(String),

    #[error("non-finite value in {stage} at index {index}")]
    NonFinite { stage: &'static str, index: usize },

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;

/// Fails with `NonFinite` at the first NaN/Infinity in `values`.
pub fn ensure_finite(stage: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => {
            tracing::error!(stage, index, "Non-finite value rejected");
            Err(ForecastError::NonFinite { stage, index })
        }
        None => Ok(()),
    }
}
