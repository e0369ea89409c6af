use std::cell::{Cell, RefCell};
use std::time::Duration;

use chrono::NaiveDate;
use sandbox_forecast::data::{fetch_with_retry, LinearBackoff, QuoteRequest, QuoteSource};
use sandbox_forecast::error::{ForecastError, Result};
use sandbox_forecast::model::price::PriceSeries;

/// Fails `failures` times, then serves a fixed history.
struct FlakySource {
    failures: u32,
    empty_first: bool,
    calls: Cell<u32>,
}

impl FlakySource {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            empty_first: false,
            calls: Cell::new(0),
        }
    }
}

impl QuoteSource for FlakySource {
    fn fetch_daily_closes(&self, _request: &QuoteRequest) -> Result<PriceSeries> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.empty_first && call == 1 {
            return Ok(PriceSeries::default());
        }
        if call <= self.failures {
            return Err(ForecastError::Model(format!("upstream down (call {})", call)));
        }
        PriceSeries::from_closes(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            &[100.0, 101.0, 102.0],
        )
    }
}

fn request() -> QuoteRequest {
    QuoteRequest {
        symbol: "AAPL".to_string(),
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    }
}

#[test]
fn delays_grow_linearly_until_success() {
    let source = FlakySource::new(3);
    let slept = RefCell::new(Vec::new());
    let (result, backoff) = fetch_with_retry(
        &source,
        &request(),
        10,
        LinearBackoff::new(Duration::from_secs(1)),
        |d| slept.borrow_mut().push(d),
    );
    assert_eq!(result.unwrap().len(), 3);
    assert_eq!(source.calls.get(), 4);
    assert_eq!(
        *slept.borrow(),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(3)
        ]
    );
    assert_eq!(backoff.attempts(), 3);
}

#[test]
fn exhausted_retries_report_data_unavailable() {
    let source = FlakySource::new(u32::MAX);
    let mut slept = Vec::new();
    let (result, backoff) = fetch_with_retry(
        &source,
        &request(),
        4,
        LinearBackoff::new(Duration::from_millis(10)),
        |d| slept.push(d),
    );
    match result {
        Err(ForecastError::DataUnavailable {
            symbol,
            attempts,
            last_error,
        }) => {
            assert_eq!(symbol, "AAPL");
            assert_eq!(attempts, 4);
            assert!(last_error.contains("call 4"));
        }
        other => panic!("expected DataUnavailable, got {:?}", other),
    }
    assert_eq!(source.calls.get(), 4);
    assert_eq!(slept.len(), 3);
    assert_eq!(backoff.attempts(), 3);
}

#[test]
fn empty_history_is_retried() {
    let source = FlakySource {
        failures: 0,
        empty_first: true,
        calls: Cell::new(0),
    };
    let mut slept = Vec::new();
    let (result, _) = fetch_with_retry(
        &source,
        &request(),
        3,
        LinearBackoff::new(Duration::from_secs(2)),
        |d| slept.push(d),
    );
    assert!(result.is_ok());
    assert_eq!(slept, vec![Duration::from_secs(2)]);
}

#[test]
fn backoff_state_carries_over_between_calls() {
    let mut backoff = LinearBackoff::new(Duration::from_secs(1));
    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    let (_, backoff) = fetch_with_retry(
        &FlakySource::new(1),
        &request(),
        5,
        backoff,
        |_| {},
    );
    assert_eq!(backoff.attempts(), 2);

    let mut backoff = backoff;
    backoff.reset();
    assert_eq!(backoff.attempts(), 0);
}
