use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use url::Url;

use super::retry::{QuoteRequest, QuoteSource};
use crate::error::{ForecastError, Result};
use crate::model::price::{PricePoint, PriceSeries};

pub const DEFAULT_CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Parses a chart response body into a validated series. Null or
/// non-positive closes are skipped; a repeated date keeps its last close.
pub fn parse_chart(body: &str) -> Result<PriceSeries> {
    let resp: ChartResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.chart.error {
        return Err(ForecastError::InvalidSeries(format!(
            "chart error {}: {}",
            err.code, err.description
        )));
    }
    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(ForecastError::InvalidSeries(
            "chart response has no result".to_string(),
        ));
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite() && *c > 0.0) else {
            continue;
        };
        let Some(dt) = DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        by_date.insert(dt.date_naive(), close);
    }
    PriceSeries::new(
        by_date
            .into_iter()
            .map(|(date, close)| PricePoint { date, close })
            .collect(),
    )
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

/// Daily closes from the public chart endpoint over a blocking HTTP client.
pub struct YahooChartClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sandbox-forecast/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chart_url(&self, request: &QuoteRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, request.symbol.trim()))
            .map_err(|e| ForecastError::Config(format!("invalid chart url: {}", e)))?;
        // period2 is exclusive; push it to the end of the requested day.
        let end = request.end.succ_opt().unwrap_or(request.end);
        url.query_pairs_mut()
            .append_pair("period1", &day_start_ts(request.start).to_string())
            .append_pair("period2", &day_start_ts(end).to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");
        Ok(url)
    }
}

impl QuoteSource for YahooChartClient {
    fn fetch_daily_closes(&self, request: &QuoteRequest) -> Result<PriceSeries> {
        let url = self.chart_url(request)?;
        tracing::debug!(url = %url, "Requesting chart");
        let body = self.http.get(url).send()?.error_for_status()?.text()?;
        parse_chart(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closes_and_skips_nulls() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"close":[185.64,null,181.91]}]}}],"error":null}}"#;
        let series = parse_chart(body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.points()[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert!((series.points()[1].close - 181.91).abs() < 1e-12);
    }

    #[test]
    fn surfaces_chart_errors() {
        let body = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(err.to_string().contains("No data found"));
    }

    #[test]
    fn chart_url_carries_period_bounds() {
        let client = YahooChartClient::new(DEFAULT_CHART_BASE_URL, Duration::from_secs(5)).unwrap();
        let url = client
            .chart_url(&QuoteRequest {
                symbol: "AAPL".to_string(),
                start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            })
            .unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL");
        let query = url.query().unwrap();
        assert!(query.contains("period1=1262304000"));
        assert!(query.contains("period2=1262390400"));
        assert!(query.contains("interval=1d"));
    }
}
