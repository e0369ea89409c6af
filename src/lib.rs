pub mod arima;
pub mod cleaner;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod indicator;
pub mod interpolate;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod returns;
pub mod simulator;
pub mod strategy;
pub mod volatility;

pub use error::{ForecastError, Result};
