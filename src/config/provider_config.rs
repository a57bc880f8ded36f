//! Market data provider configuration parsing from environment variables.
//!
//! This module handles endpoints and HTTP behaviour for both supported
//! providers:
//! - Yahoo-style quote service (stocks, ETFs, indices)
//! - Binance (crypto klines)

use super::parse_env;
use anyhow::Result;
use std::env;

/// Quote service endpoint configuration
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
}

impl YahooConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("YAHOO_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),
        }
    }
}

/// Binance public market data configuration
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
}

impl BinanceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("BINANCE_BASE_URL")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
        }
    }
}

/// Aggregated provider configuration
#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub yahoo: YahooConfig,
    pub binance: BinanceConfig,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
}

impl ProviderEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            yahoo: YahooConfig::from_env(),
            binance: BinanceConfig::from_env(),
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", 30)?,
            http_max_retries: parse_env("HTTP_MAX_RETRIES", 3)?,
        })
    }
}
