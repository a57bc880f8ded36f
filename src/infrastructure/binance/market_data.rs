//! Binance Market Data Provider
//!
//! Fetches the exchange's default window of recent klines for a symbol.

use crate::domain::market::{Bar, Granularity};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::debug;

pub struct BinanceMarketDataProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl BinanceMarketDataProvider {
    pub fn builder() -> BinanceMarketDataProviderBuilder {
        BinanceMarketDataProviderBuilder::default()
    }
}

#[derive(Default)]
pub struct BinanceMarketDataProviderBuilder {
    base_url: Option<String>,
    http: Option<HttpClientSettings>,
}

impl BinanceMarketDataProviderBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn http(mut self, settings: HttpClientSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn build(self) -> Result<BinanceMarketDataProvider> {
        let base_url = self.base_url.context("base_url is required")?;
        Ok(BinanceMarketDataProvider {
            client: HttpClientFactory::create_client(self.http.unwrap_or_default()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Converts kline rows `[open_time_ms, "open", "high", "low", "close", "volume", ...]`.
///
/// Rows that do not have that shape are skipped.
pub fn parse_klines(rows: &[Value]) -> Vec<Bar> {
    rows.iter()
        .filter_map(|row| {
            let arr = row.as_array()?;
            if arr.len() < 6 {
                return None;
            }
            let field = |i: usize| -> Option<f64> {
                match &arr[i] {
                    Value::String(s) => s.parse::<f64>().ok(),
                    other => other.as_f64(),
                }
            };

            Some(Bar {
                timestamp: DateTime::from_timestamp_millis(arr[0].as_i64()?)?,
                open: field(1)?,
                high: field(2)?,
                low: field(3)?,
                close: field(4)?,
                volume: field(5)?,
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for BinanceMarketDataProvider {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_recent_bars(&self, symbol: &str, granularity: Granularity) -> Result<Vec<Bar>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let interval = granularity.to_binance_interval();
        let url_with_query = build_url_with_query(
            &url,
            &[("symbol", symbol), ("interval", interval.as_str())],
        );

        let response = self
            .client
            .get(&url_with_query)
            .send()
            .await
            .context(format!("Failed to fetch klines for {} from Binance", symbol))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance klines fetch failed ({}): {}", status, error_text);
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse Binance klines response")?;
        let bars = parse_klines(&rows);

        debug!("Binance: fetched {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }
}
