use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use common::{Candle, Error, MarketData, MarketSet, Result};

const BASE_URL: &str = "https://api.binance.com";

/// Binance caps `limit` on the klines endpoint.
const MAX_KLINES: usize = 1000;

/// Public REST market-data client for Binance.
///
/// Symbols are exchanged with callers in canonical `BASE/QUOTE` form; Binance
/// itself identifies pairs by the concatenation (`BTCUSDT`).
pub struct BinanceClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl BinanceClient {
    /// `api_key` is optional; when present it is sent so requests count
    /// against the account's rate limits rather than the IP's.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, timeout, BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: base_url.into(),
            http,
        })
    }

    async fn public_get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.get(&url).query(query);
        if let Some(key) = &self.api_key {
            req = req.header("X-MBX-APIKEY", key);
        }

        let resp = req.send().await.map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

/// `BTC/USDT` → `BTCUSDT`.
fn exchange_id(symbol: &str) -> String {
    symbol.replace('/', "")
}

#[async_trait]
impl MarketData for BinanceClient {
    async fn load_markets(&self) -> Result<MarketSet> {
        let body = self.public_get("/api/v3/exchangeInfo", &[]).await?;
        let markets = parse_markets(&body)?;
        debug!(count = markets.len(), "Loaded Binance markets");
        Ok(markets)
    }

    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let query = [
            ("symbol", exchange_id(symbol)),
            ("interval", timeframe.to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ];
        debug!(symbol, timeframe, limit, "Fetching klines");
        let body = self.public_get("/api/v3/klines", &query).await?;
        parse_klines(&body)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .public_get("/api/v3/ticker/price", &[("symbol", exchange_id(symbol))])
            .await?;
        let ticker: PriceTicker = serde_json::from_str(&body)?;

        ticker
            .price
            .parse::<f64>()
            .map_err(|e| Error::Exchange(e.to_string()))
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    status: String,
    base_asset: String,
    quote_asset: String,
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

fn parse_markets(body: &str) -> Result<MarketSet> {
    let info: ExchangeInfo = serde_json::from_str(body)?;

    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| format!("{}/{}", s.base_asset, s.quote_asset))
        .collect())
}

/// Kline rows are positional arrays:
/// `[open_time_ms, "open", "high", "low", "close", "volume", close_time_ms, ...]`.
fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() < 6 {
                return Err(Error::Exchange(format!(
                    "malformed kline at index {i}: expected at least 6 fields, got {}",
                    row.len()
                )));
            }
            let open_ms = row[0]
                .as_i64()
                .ok_or_else(|| Error::Exchange(format!("malformed kline open time at index {i}")))?;
            let timestamp: DateTime<Utc> = Utc
                .timestamp_millis_opt(open_ms)
                .single()
                .ok_or_else(|| Error::Exchange(format!("kline open time out of range: {open_ms}")))?;

            Ok(Candle {
                timestamp,
                open: decimal(&row[1], "open", i)?,
                high: decimal(&row[2], "high", i)?,
                low: decimal(&row[3], "low", i)?,
                close: decimal(&row[4], "close", i)?,
                volume: decimal(&row[5], "volume", i)?,
            })
        })
        .collect()
}

/// Binance sends prices as decimal strings; accept bare numbers too.
fn decimal(value: &Value, field: &str, index: usize) -> Result<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::Exchange(format!("malformed kline {field} at index {index}: {value}")))
}
