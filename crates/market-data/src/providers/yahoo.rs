//! Yahoo Finance chart API provider.
//!
//! Fetches daily OHLCV bars from the v8 chart endpoint. The response format
//! is unofficial and changes without notice, so every structural surprise is
//! reported as `ResponseFormat` and the CSV provider serves as fallback.

use async_trait::async_trait;
use market_core::error::{FetchError, MarketError};
use market_core::traits::BarProvider;
use market_core::types::{Bar, Period};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Yahoo provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    pub base_url: String,
    pub user_agent: String,
    /// HTTP client timeout; the fetcher's per-attempt timeout normally fires first
    pub timeout_secs: u64,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl YahooProvider {
    pub fn new(config: &YahooConfig) -> Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| MarketError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    fn chart_url(&self, symbol: &str, period: Period) -> String {
        format!(
            "{}/v8/finance/chart/{symbol}?range={}&interval=1d",
            self.base_url,
            period.as_range()
        )
    }
}

/// Map a non-success HTTP status to a fetch error.
fn status_error(symbol: &str, status: StatusCode, retry_after: Option<u64>) -> FetchError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited {
            retry_after_secs: retry_after,
        },
        StatusCode::NOT_FOUND => FetchError::SymbolNotFound(symbol.to_string()),
        s if s.is_server_error() => FetchError::Transient(format!("HTTP {s} for {symbol}")),
        s => FetchError::ResponseFormat(format!("HTTP {s} for {symbol}")),
    }
}

/// Convert a chart response into raw, unvalidated bars.
///
/// Missing values become NaN so the validator rejects those bars with a
/// reason instead of silently dropping them. Rows where every field is
/// missing (non-trading days) are skipped.
fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, FetchError> {
    let result = match (resp.chart.result, resp.chart.error) {
        (_, Some(err)) if err.code == "Not Found" => return Err(FetchError::SymbolNotFound(symbol.to_string())),
        (_, Some(err)) => {
            return Err(FetchError::ResponseFormat(format!(
                "{}: {}",
                err.code,
                err.description.unwrap_or_default()
            )))
        }
        (Some(result), None) => result,
        (None, None) => return Err(FetchError::ResponseFormat("empty result with no error".into())),
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::ResponseFormat("result array is empty".into()))?;
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::ResponseFormat("no quote data".into()))?;

    let field = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let bars: Vec<Bar> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let values = [
                field(&quote.open, i),
                field(&quote.high, i),
                field(&quote.low, i),
                field(&quote.close, i),
                field(&quote.volume, i),
            ];
            if values.iter().all(Option::is_none) {
                return None;
            }
            let [open, high, low, close, volume] = values.map(|v| v.unwrap_or(f64::NAN));
            Some(Bar::new(ts * 1000, open, high, low, close, volume))
        })
        .collect();

    if bars.is_empty() {
        return Err(FetchError::SymbolNotFound(symbol.to_string()));
    }
    Ok(bars)
}

#[async_trait]
impl BarProvider for YahooProvider {
    async fn fetch_bars(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FetchError> {
        let url = self.chart_url(symbol, period);
        debug!(symbol, %url, "Yahoo chart request");

        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_ms)
            } else {
                FetchError::Transient(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(status_error(symbol, status, retry_after));
        }

        let chart: ChartResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::ResponseFormat(format!("failed to parse response for {symbol}: {e}")))?;

        parse_chart(symbol, chart)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(symbol: &str, json: &str) -> Result<Vec<Bar>, FetchError> {
        parse_chart(symbol, serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_parse_bars() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[100.0,null,102.0],"high":[101.0,null,103.0],
            "low":[99.0,null,101.0],"close":[100.5,null,102.5],"volume":[1000,null,1200]}]}}],
            "error":null}}"#;

        let bars = parse("SPY", json).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, 1_704_205_800_000);
        assert_eq!(bars[1].close, 102.5);
        assert_eq!(bars[1].volume, 1200.0);
    }

    #[test]
    fn test_partial_row_kept_as_nan() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800],
            "indicators":{"quote":[{"open":[100.0],"high":[null],"low":[99.0],"close":[100.5],"volume":[10]}]}}],
            "error":null}}"#;

        let bars = parse("SPY", json).unwrap();
        assert!(bars[0].high.is_nan());
    }

    #[test]
    fn test_not_found_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert_eq!(parse("ZZZZ", json), Err(FetchError::SymbolNotFound("ZZZZ".into())));
    }

    #[test]
    fn test_unexpected_shape() {
        let json = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(matches!(parse("SPY", json), Err(FetchError::ResponseFormat(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error("SPY", StatusCode::TOO_MANY_REQUESTS, Some(30)),
            FetchError::RateLimited {
                retry_after_secs: Some(30)
            }
        );
        assert!(matches!(
            status_error("SPY", StatusCode::BAD_GATEWAY, None),
            FetchError::Transient(_)
        ));
        assert_eq!(
            status_error("SPY", StatusCode::NOT_FOUND, None),
            FetchError::SymbolNotFound("SPY".into())
        );
        assert!(matches!(
            status_error("SPY", StatusCode::UNAUTHORIZED, None),
            FetchError::ResponseFormat(_)
        ));
    }

    #[test]
    fn test_chart_url() {
        let provider = YahooProvider::new(&YahooConfig::default()).unwrap();
        assert_eq!(
            provider.chart_url("XLK", Period::SixMonths),
            "https://query2.finance.yahoo.com/v8/finance/chart/XLK?range=6mo&interval=1d"
        );
    }
}
