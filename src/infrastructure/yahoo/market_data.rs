//! Yahoo Finance chart provider
//!
//! Requests `/v8/finance/chart/{symbol}` with an interval and range derived
//! from the granularity. Bars with any missing OHLCV field are skipped.

use crate::domain::market::{Bar, Granularity};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query, encode_component,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
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
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Flattens the column-oriented chart payload into bars.
    pub fn into_bars(self) -> Result<Vec<Bar>> {
        if let Some(error) = self.chart.error {
            anyhow::bail!(
                "Chart error {}: {}",
                error.code,
                error.description.unwrap_or_default()
            );
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let column = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

        let bars = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp(*ts, 0)?,
                    open: column(&quote.open, i)?,
                    high: column(&quote.high, i)?,
                    low: column(&quote.low, i)?,
                    close: column(&quote.close, i)?,
                    volume: column(&quote.volume, i)?,
                })
            })
            .collect();
        Ok(bars)
    }
}

pub struct YahooMarketDataProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl YahooMarketDataProvider {
    pub fn builder() -> YahooMarketDataProviderBuilder {
        YahooMarketDataProviderBuilder::default()
    }
}

#[derive(Default)]
pub struct YahooMarketDataProviderBuilder {
    base_url: Option<String>,
    http: Option<HttpClientSettings>,
}

impl YahooMarketDataProviderBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn http(mut self, settings: HttpClientSettings) -> Self {
        self.http = Some(settings);
        self
    }

    pub fn build(self) -> Result<YahooMarketDataProvider> {
        let base_url = self.base_url.context("base_url is required")?;
        Ok(YahooMarketDataProvider {
            client: HttpClientFactory::create_client(self.http.unwrap_or_default()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketDataProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn fetch_recent_bars(&self, symbol: &str, granularity: Granularity) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            encode_component(symbol)
        );
        let interval = granularity.to_yahoo_interval();
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("interval", interval.as_str()),
                ("range", granularity.to_yahoo_range()),
            ],
        );

        let response = self
            .client
            .get(&url_with_query)
            .send()
            .await
            .context(format!("Failed to fetch chart for {}", symbol))?;

        // Unknown or delisted symbols
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Yahoo: no chart for {}", symbol);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo chart fetch failed ({}): {}", status, error_text);
        }

        let chart: ChartResponse = response
            .json()
            .await
            .context("Failed to parse Yahoo chart response")?;
        let bars = chart.into_bars()?;

        debug!("Yahoo: fetched {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }
}
