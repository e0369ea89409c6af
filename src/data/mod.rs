pub mod retry;
pub mod yahoo;

pub use retry::{fetch_with_retry, LinearBackoff, QuoteRequest, QuoteSource, DEFAULT_MAX_ATTEMPTS};
pub use yahoo::YahooChartClient;
