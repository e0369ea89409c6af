use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::arima::optimizer::NelderMeadConfig;
use crate::arima::ArimaConfig;
use crate::data::retry::DEFAULT_MAX_ATTEMPTS;
use crate::data::yahoo::DEFAULT_CHART_BASE_URL;
use crate::ensemble::{SearchConfig, SearchSpace};
use crate::pipeline::PipelineConfig;
use crate::strategy::{SignalThresholds, StrategyEvaluator};
use crate::volatility::VolatilityModelConfig;

pub const SYMBOL_ENV: &str = "SANDBOX_FORECAST_SYMBOL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub symbol: String,
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    /// Defaults to today when absent.
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default = "default_chart_base_url")]
    pub chart_base_url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_step_secs")]
    pub backoff_step_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub horizon: usize,
    pub volatility_window: usize,
    pub smoothing_window: usize,
    pub arima_max_p: usize,
    pub arima_max_d: usize,
    pub arima_max_q: usize,
    pub arima_max_order: usize,
    pub arima_max_iter: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let arima = ArimaConfig::default();
        Self {
            horizon: crate::simulator::DEFAULT_HORIZON,
            volatility_window: crate::volatility::DEFAULT_VOLATILITY_WINDOW,
            smoothing_window: crate::simulator::DEFAULT_SMOOTHING_WINDOW,
            arima_max_p: arima.max_p,
            arima_max_d: arima.max_d,
            arima_max_q: arima.max_q,
            arima_max_order: arima.max_order,
            arima_max_iter: arima.optimizer.max_iter,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub n_trials: usize,
    pub n_folds: usize,
    pub patience: usize,
    pub seed: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        let d = SearchConfig::default();
        Self {
            n_trials: d.n_trials,
            n_folds: d.n_folds,
            patience: d.patience,
            seed: d.seed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub signal_days: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        let d = StrategyEvaluator::default();
        Self {
            buy_threshold: d.thresholds.buy,
            sell_threshold: d.thresholds.sell,
            signal_days: d.signal_days,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON log lines go here; stderr when unset.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
}

fn default_chart_base_url() -> String {
    DEFAULT_CHART_BASE_URL.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_step_secs() -> u64 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DataConfig {
    pub fn end_or_today(&self) -> NaiveDate {
        self.end
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_secs(self.backoff_step_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config = Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if let Ok(symbol) = std::env::var(SYMBOL_ENV) {
            if !symbol.trim().is_empty() {
                config.data.symbol = symbol;
            }
        }
        config.data.symbol = config.data.symbol.trim().to_ascii_uppercase();

        config
            .pipeline()
            .validate()
            .context("invalid model/search/strategy settings")?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("invalid TOML")?;
        Ok(config)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        let m = &self.model;
        PipelineConfig {
            horizon: m.horizon,
            volatility: VolatilityModelConfig {
                window: m.volatility_window,
            },
            smoothing_window: m.smoothing_window,
            arima: ArimaConfig {
                max_p: m.arima_max_p,
                max_d: m.arima_max_d,
                max_q: m.arima_max_q,
                max_order: m.arima_max_order,
                optimizer: NelderMeadConfig {
                    max_iter: m.arima_max_iter,
                    ..NelderMeadConfig::default()
                },
                ..ArimaConfig::default()
            },
            space: SearchSpace::default(),
            search: SearchConfig {
                n_trials: self.search.n_trials,
                n_folds: self.search.n_folds,
                patience: self.search.patience,
                seed: self.search.seed,
                thresholds: self.thresholds(),
            },
            strategy: StrategyEvaluator {
                thresholds: self.thresholds(),
                signal_days: self.strategy.signal_days,
            },
        }
    }

    fn thresholds(&self) -> SignalThresholds {
        SignalThresholds {
            buy: self.strategy.buy_threshold,
            sell: self.strategy.sell_threshold,
        }
    }
}
