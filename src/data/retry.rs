use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{ForecastError, Result};
use crate::model::price::PriceSeries;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Anything that can produce a daily close history.
pub trait QuoteSource {
    fn fetch_daily_closes(&self, request: &QuoteRequest) -> Result<PriceSeries>;
}

/// Linear backoff: the N-th failure waits `N * step`.
///
/// Passed by value into [`fetch_with_retry`] and handed back afterwards, so the
/// caller owns the accumulated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    step: Duration,
    attempt: u32,
}

impl LinearBackoff {
    pub fn new(step: Duration) -> Self {
        Self { step, attempt: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.step.saturating_mul(self.attempt)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Blocking fetch with up to `max_attempts` tries. `sleep` is called between
/// attempts with the backoff delay; an empty history counts as a failure.
pub fn fetch_with_retry<S, F>(
    source: &S,
    request: &QuoteRequest,
    max_attempts: u32,
    mut backoff: LinearBackoff,
    mut sleep: F,
) -> (Result<PriceSeries>, LinearBackoff)
where
    S: QuoteSource + ?Sized,
    F: FnMut(Duration),
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = String::from("no attempt made");
    for attempt in 1..=max_attempts {
        match source.fetch_daily_closes(request) {
            Ok(series) if !series.is_empty() => {
                tracing::info!(
                    symbol = %request.symbol,
                    attempt,
                    points = series.len(),
                    "Fetched daily closes"
                );
                return (Ok(series), backoff);
            }
            Ok(_) => {
                last_error = "empty price history".to_string();
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }
        if attempt < max_attempts {
            let delay = backoff.next_delay();
            tracing::warn!(
                symbol = %request.symbol,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Fetch failed, retrying"
            );
            sleep(delay);
        }
    }
    tracing::error!(
        symbol = %request.symbol,
        attempts = max_attempts,
        error = %last_error,
        "Fetch retries exhausted"
    );
    (
        Err(ForecastError::DataUnavailable {
            symbol: request.symbol.clone(),
            attempts: max_attempts,
            last_error,
        }),
        backoff,
    )
}
