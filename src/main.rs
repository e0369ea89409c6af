use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use sandbox_forecast::config::Config;
use sandbox_forecast::data::{fetch_with_retry, LinearBackoff, QuoteRequest, YahooChartClient};
use sandbox_forecast::pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "sandbox-forecast", about = "Forecast daily closes for one ticker")]
struct Args {
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,
    /// Overrides `data.symbol`.
    #[arg(long)]
    symbol: Option<String>,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Overrides `search.seed`.
    #[arg(long)]
    seed: Option<u64>,
    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .context("invalid log level")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .json();
    match &config.logging.file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path))?;
            builder.with_writer(log_file).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(symbol) = args.symbol {
        config.data.symbol = symbol.trim().to_ascii_uppercase();
    }
    if let Some(start) = args.start {
        config.data.start = start;
    }
    if args.end.is_some() {
        config.data.end = args.end;
    }
    if let Some(seed) = args.seed {
        config.search.seed = seed;
    }

    init_tracing(&config)?;
    tracing::info!(
        symbol = %config.data.symbol,
        start = %config.data.start,
        end = %config.data.end_or_today(),
        "Starting sandbox-forecast"
    );

    let pipeline = Pipeline::new(config.pipeline()).context("invalid pipeline settings")?;
    tracing::debug!(
        horizon = pipeline.config().horizon,
        folds = pipeline.config().search.n_folds,
        trials = pipeline.config().search.n_trials,
        "Pipeline assembled"
    );
    let client = YahooChartClient::new(&config.data.chart_base_url, config.data.timeout())?;
    let request = QuoteRequest {
        symbol: config.data.symbol.clone(),
        start: config.data.start,
        end: config.data.end_or_today(),
    };
    let (prices, backoff) = fetch_with_retry(
        &client,
        &request,
        config.data.max_attempts,
        LinearBackoff::new(config.data.backoff_step()),
        std::thread::sleep,
    );
    let prices = prices.with_context(|| format!("failed to fetch {}", request.symbol))?;
    tracing::debug!(retries = backoff.attempts(), "Price history ready");

    let report = pipeline.run(&request.symbol, &prices)?;
    let json = serde_json::to_string_pretty(&report)?;
    match args.output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
