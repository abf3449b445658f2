//! Kraken public REST market data.
//!
//! Uses the unauthenticated `OHLC` and `Ticker` endpoints only. Nothing in
//! this crate places orders.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::traits::{MarketData, Timeframe};
use crate::domain::{Candle, Price};
use crate::error::FeedError;

/// Default public API root.
pub const DEFAULT_API_URL: &str = "https://api.kraken.com";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<Map<String, Value>>,
}

/// Market data from Kraken's public REST API.
pub struct KrakenFeed {
    http: reqwest::Client,
    api_url: String,
}

impl KrakenFeed {
    /// Fails only when the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `BTC/USD` -> `XBTUSD`, Kraken's alt-name form.
    #[must_use]
    pub fn pair_name(symbol: &str) -> String {
        let (base, quote) = symbol.split_once('/').unwrap_or((symbol, ""));
        let base = if base.eq_ignore_ascii_case("BTC") { "XBT" } else { base };
        format!("{}{}", base.to_ascii_uppercase(), quote.to_ascii_uppercase())
    }

    async fn get(&self, symbol: &str, path: &str, query: &[(&str, String)]) -> Result<Map<String, Value>, FeedError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(symbol, &e))?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| FeedError::unavailable(symbol, format!("invalid response: {e}")))?;

        if !envelope.error.is_empty() {
            return Err(FeedError::unavailable(symbol, envelope.error.join("; ")));
        }
        envelope
            .result
            .ok_or_else(|| FeedError::unavailable(symbol, "response has no result"))
    }
}

fn request_error(symbol: &str, e: &reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout {
            symbol: symbol.to_string(),
        }
    } else {
        FeedError::unavailable(symbol, e.to_string())
    }
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Parse one `[time, open, high, low, close, vwap, volume, count]` row.
///
/// Rows with a non-positive price are dropped.
fn parse_row(row: &Value) -> Option<Candle> {
    let fields = row.as_array()?;
    let secs = fields.first()?.as_i64()?;
    let price = |idx: usize| fields.get(idx).and_then(decimal).filter(|p| *p > Decimal::ZERO);
    Some(Candle {
        open_time: DateTime::<Utc>::from_timestamp(secs, 0)?,
        open: price(1)?,
        high: price(2)?,
        low: price(3)?,
        close: price(4)?,
        volume: decimal(fields.get(6)?)?,
    })
}

/// Candles from an OHLC `result` object, keeping the last `limit`.
fn parse_ohlc(symbol: &str, result: &Map<String, Value>, limit: usize) -> Result<Vec<Candle>, FeedError> {
    let rows = result
        .iter()
        .find(|(key, _)| key.as_str() != "last")
        .and_then(|(_, v)| v.as_array())
        .ok_or_else(|| FeedError::unavailable(symbol, "no OHLC series in response"))?;

    let mut candles: Vec<Candle> = rows.iter().filter_map(parse_row).collect();
    if candles.len() < rows.len() {
        debug!(symbol, skipped = rows.len() - candles.len(), "Skipped invalid OHLC rows");
    }
    if candles.is_empty() {
        return Err(FeedError::unavailable(symbol, "no valid OHLC rows"));
    }
    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    Ok(candles)
}

/// Last trade price (`c[0]`) from a Ticker `result` object.
fn parse_ticker(symbol: &str, result: &Map<String, Value>) -> Result<Price, FeedError> {
    result
        .values()
        .next()
        .and_then(|t| t.get("c"))
        .and_then(|c| c.get(0))
        .and_then(decimal)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| FeedError::unavailable(symbol, "ticker has no last price"))
}

#[async_trait]
impl MarketData for KrakenFeed {
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let query = [
            ("pair", Self::pair_name(symbol)),
            ("interval", timeframe.minutes().to_string()),
        ];
        let result = self.get(symbol, "/0/public/OHLC", &query).await?;
        parse_ohlc(symbol, &result, limit)
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<Price, FeedError> {
        let query = [("pair", Self::pair_name(symbol))];
        let result = self.get(symbol, "/0/public/Ticker", &query).await?;
        parse_ticker(symbol, &result)
    }

    fn name(&self) -> &'static str {
        "kraken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn result(json: &str) -> Map<String, Value> {
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        envelope.result.unwrap()
    }

    #[test]
    fn pair_names() {
        assert_eq!(KrakenFeed::pair_name("BTC/USD"), "XBTUSD");
        assert_eq!(KrakenFeed::pair_name("eth/usd"), "ETHUSD");
        assert_eq!(KrakenFeed::pair_name("SOLUSD"), "SOLUSD");
    }

    #[test]
    fn parses_ohlc_and_truncates_to_limit() {
        let json = r#"{"error":[],"result":{"XXBTZUSD":[
            [1765893600,"100.0","101.0","99.0","100.5","100.2","3.5",12],
            [1765897200,"100.5","102.0","100.0","101.5","101.0","4.0",10],
            [1765900800,"101.5","103.0","101.0","102.5","102.0","2.0",8]
        ],"last":1765900800}}"#;
        let candles = parse_ohlc("BTC/USD", &result(json), 2).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, dec!(100.5));
        assert_eq!(candles[1].close, dec!(102.5));
        assert_eq!(candles[1].volume, dec!(2.0));
        assert_eq!(candles[1].open_time.timestamp(), 1765900800);
    }

    #[test]
    fn empty_ohlc_is_unavailable() {
        let json = r#"{"error":[],"result":{"XXBTZUSD":[],"last":0}}"#;
        let err = parse_ohlc("BTC/USD", &result(json), 50).unwrap_err();
        assert!(matches!(err, FeedError::DataUnavailable { .. }));
    }

    #[test]
    fn non_positive_prices_are_dropped() {
        let json = r#"{"error":[],"result":{"XXBTZUSD":[
            [1765893600,"2.5","2.5","0","0","1.2","3.5",12],
            [1765897200,"100.5","102.0","100.0","101.5","101.0","4.0",10],
            [1765900800,"101.5","103.0","-1","102.5","102.0","2.0",8]
        ],"last":1765900800}}"#;
        let candles = parse_ohlc("BTC/USD", &result(json), 50).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, dec!(101.5));
    }

    #[test]
    fn all_invalid_rows_are_unavailable() {
        let json = r#"{"error":[],"result":{"XXBTZUSD":[
            [1765893600,"0","0","0","0","0","0",0]
        ],"last":1765893600}}"#;
        let err = parse_ohlc("BTC/USD", &result(json), 50).unwrap_err();
        assert!(matches!(err, FeedError::DataUnavailable { .. }));
    }

    #[test]
    fn builds_with_trimmed_api_url() {
        let feed = KrakenFeed::new("https://api.kraken.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(feed.api_url, "https://api.kraken.com");
        assert_eq!(feed.name(), "kraken");
    }

    #[test]
    fn parses_ticker_last_price() {
        let json = r#"{"error":[],"result":{"XXBTZUSD":{"a":["101","1","1.0"],"c":["100.7","0.01"]}}}"#;
        assert_eq!(parse_ticker("BTC/USD", &result(json)).unwrap(), dec!(100.7));
    }

    #[test]
    fn api_errors_are_surfaced() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"error":["EQuery:Unknown asset pair"]}"#).unwrap();
        assert_eq!(envelope.error, vec!["EQuery:Unknown asset pair".to_string()]);
        assert!(envelope.result.is_none());
    }
}
