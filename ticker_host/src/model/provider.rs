//! Quote providers.
//!
//! A `QuoteProvider` turns one symbol into a `Quote` or a typed failure. The shipped
//! implementation talks to the Yahoo chart endpoint:
//!
//! `GET {endpoint}/{symbol}?range=1d&interval=1d`
//!
//! and reads `chart.result[0].meta`. Only `regularMarketPrice` is mandatory; change values
//! are derived or zeroed by `Quote::from_raw` when absent.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use ticker_common::{Quote, Result, Symbol, TickerError};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Source of quotes for single symbols.
pub trait QuoteProvider: Send + Sync {
    fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote>;
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_change_percent: Option<f64>,
    chart_previous_close: Option<f64>,
}

/// Blocking client for the Yahoo chart API.
pub struct YahooChartProvider {
    client: Client,
    endpoint: String,
}

impl YahooChartProvider {
    /// `timeout` bounds every request.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TickerError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(YahooChartProvider {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, symbol: &Symbol) -> String {
        format!("{}/{}?range=1d&interval=1d", self.endpoint, symbol)
    }
}

impl QuoteProvider for YahooChartProvider {
    fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote> {
        let url = self.url(symbol);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TickerError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TickerError::Network(format!("HTTP {} for {}", status, symbol)));
        }
        let body = response
            .text()
            .map_err(|e| TickerError::Network(e.to_string()))?;
        parse_chart(symbol, &body)
    }
}

/// Extracts a quote from a chart API body.
pub fn parse_chart(symbol: &Symbol, body: &str) -> Result<Quote> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| TickerError::MalformedResponse(e.to_string()))?;
    let meta = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.meta)
        .ok_or(TickerError::MissingField("chart.result[0].meta"))?;
    let price = meta
        .regular_market_price
        .ok_or(TickerError::MissingField("regularMarketPrice"))?;

    Ok(Quote::from_raw(
        symbol.clone(),
        price,
        meta.chart_previous_close,
        meta.regular_market_change_percent,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticker_common::symbol::DEFAULT_SUFFIX;

    fn tcs() -> Symbol {
        Symbol::normalize("tcs", DEFAULT_SUFFIX).unwrap()
    }

    #[test]
    fn parses_full_meta() {
        let body = r#"{"chart":{"result":[{"meta":{
            "regularMarketPrice": 3521.456,
            "regularMarketChangePercent": -0.4321,
            "chartPreviousClose": 3536.7
        }}],"error":null}}"#;
        let quote = parse_chart(&tcs(), body).unwrap();
        assert_eq!(quote.symbol, tcs());
        assert_eq!(quote.last_price, 3521.46);
        assert_eq!(quote.change_absolute, -15.24);
        assert_eq!(quote.change_percent, -0.43);
    }

    #[test]
    fn missing_percent_is_derived_from_previous_close() {
        let body = r#"{"chart":{"result":[{"meta":{
            "regularMarketPrice": 102.0,
            "chartPreviousClose": 100.0
        }}]}}"#;
        assert_eq!(parse_chart(&tcs(), body).unwrap().change_percent, 2.0);
    }

    #[test]
    fn missing_price_is_missing_field() {
        let body = r#"{"chart":{"result":[{"meta":{"chartPreviousClose": 100.0}}]}}"#;
        assert!(matches!(
            parse_chart(&tcs(), body),
            Err(TickerError::MissingField("regularMarketPrice"))
        ));
    }

    #[test]
    fn null_result_is_missing_field() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        assert!(matches!(
            parse_chart(&tcs(), body),
            Err(TickerError::MissingField(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_chart(&tcs(), "<html>rate limited</html>"),
            Err(TickerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn builds_chart_url() {
        let provider =
            YahooChartProvider::new("https://example.test/chart/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            provider.url(&tcs()),
            "https://example.test/chart/TCS.NS?range=1d&interval=1d"
        );
    }
}
