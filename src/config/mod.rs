//! Configuration module for Surpriver.
//!
//! Run parameters are loaded from environment variables (optionally via a
//! `.env` file) and can be overridden from the command line. Everything is
//! validated before any market data is requested.

mod cache_config;
mod provider_config;

pub use cache_config::CacheEnvConfig;
pub use provider_config::{BinanceConfig, ProviderEnvConfig, YahooConfig};

use crate::domain::errors::ConfigError;
use crate::domain::market::Granularity;
use crate::domain::scan::RunMode;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Market data provider selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    YahooFinance,
    Binance,
}

impl FromStr for DataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo_finance" | "yahoo" => Ok(DataSource::YahooFinance),
            "binance" => Ok(DataSource::Binance),
            _ => Err(ConfigError::UnsupportedDataSource(s.to_string())),
        }
    }
}

impl DataSource {
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::Binance => "binance",
        }
    }

    /// Whether the provider has a bar interval matching `granularity`.
    ///
    /// Neither the chart endpoint nor klines offer 10-minute bars.
    pub fn serves(&self, granularity: Granularity) -> bool {
        !matches!(granularity, Granularity::TenMin)
    }
}

/// How ranked results are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cli" => Ok(OutputFormat::Cli),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::UnsupportedOutputFormat(s.to_string())),
        }
    }
}

/// Main scan configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    // Ranking
    pub top_n: usize,
    pub history_to_use: usize,

    // Acquisition
    pub data_source: DataSource,
    pub granularity: Granularity,
    pub min_volume: f64,
    pub volatility_threshold: f64,
    pub stocks_dir: PathBuf,
    pub stock_list: String,

    // Backtest
    pub is_test: bool,
    pub future_bars: usize,

    // Output
    pub output_format: OutputFormat,
    pub output_dir: PathBuf,

    // Concurrency
    pub acquisition_concurrency: usize,
    pub symbol_timeout_secs: u64,
    pub run_deadline_secs: Option<u64>,

    // Scoring
    pub isolation_trees: usize,
    pub isolation_seed: u64,

    pub providers: ProviderEnvConfig,
    pub cache: CacheEnvConfig,
}

impl ScanConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let granularity_minutes: u32 = parse_env("DATA_GRANULARITY_MINUTES", 15)?;
        let data_source = env::var("DATA_SOURCE").unwrap_or_else(|_| "yahoo_finance".to_string());
        let output_format = env::var("OUTPUT_FORMAT").unwrap_or_else(|_| "cli".to_string());

        let run_deadline_secs = match env::var("RUN_DEADLINE_SECS") {
            Ok(value) => Some(
                value
                    .parse::<u64>()
                    .context("Failed to parse RUN_DEADLINE_SECS")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            top_n: parse_env("TOP_N", 25)?,
            history_to_use: parse_env("HISTORY_TO_USE", 7)?,

            data_source: DataSource::from_str(&data_source)?,
            granularity: Granularity::from_minutes(granularity_minutes)?,
            min_volume: parse_env("MIN_VOLUME", 5000.0)?,
            volatility_threshold: parse_env("VOLATILITY_FILTER", 0.05)?,
            stocks_dir: PathBuf::from(env::var("STOCKS_DIR").unwrap_or_else(|_| "stocks".into())),
            stock_list: env::var("STOCK_LIST").unwrap_or_else(|_| "stocks.txt".to_string()),

            is_test: parse_flag("IS_TEST", false)?,
            future_bars: parse_env("FUTURE_BARS", 25)?,

            output_format: OutputFormat::from_str(&output_format)?,
            output_dir: PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| ".".into())),

            acquisition_concurrency: parse_env("ACQUISITION_CONCURRENCY", 8)?,
            symbol_timeout_secs: parse_env("SYMBOL_TIMEOUT_SECS", 30)?,
            run_deadline_secs,

            isolation_trees: parse_env("ISOLATION_TREES", 100)?,
            isolation_seed: parse_env("ISOLATION_SEED", 0)?,

            providers: ProviderEnvConfig::from_env().context("Failed to load provider config")?,
            cache: CacheEnvConfig::from_env().context("Failed to load cache config")?,
        })
    }

    pub fn symbol_list_path(&self) -> PathBuf {
        self.stocks_dir.join(&self.stock_list)
    }

    pub fn run_mode(&self) -> RunMode {
        if self.is_test {
            RunMode::Backtest
        } else {
            RunMode::Live
        }
    }

    /// Cross-field checks that must pass before acquisition starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_test && self.future_bars < 2 {
            return Err(ConfigError::HoldoutTooShort {
                future_bars: self.future_bars,
            });
        }
        if self.top_n == 0 {
            return Err(ConfigError::InvalidValue {
                field: "top_n",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.history_to_use < 3 {
            return Err(ConfigError::InvalidValue {
                field: "history_to_use",
                reason: format!("need at least 3 bars for a trend fit, got {}", self.history_to_use),
            });
        }
        if self.isolation_trees == 0 {
            return Err(ConfigError::InvalidValue {
                field: "isolation_trees",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.acquisition_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "acquisition_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache.flush_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_flush_every",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.cache.load && !self.data_source.serves(self.granularity) {
            return Err(ConfigError::GranularityNotServed {
                minutes: self.granularity.to_minutes(),
                provider: self.data_source.name().to_string(),
            });
        }
        // A cache replay needs no symbol list
        if !self.cache.load && !self.symbol_list_path().is_file() {
            return Err(ConfigError::MissingSymbolList {
                path: self.symbol_list_path().display().to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

/// Accepts `1`/`0` as well as `true`/`false`
pub(crate) fn parse_flag(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => anyhow::bail!("Failed to parse {}: '{}' is not a flag", key, other),
        },
        Err(_) => Ok(default),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::scan_config;
    use super::*;

    fn config_with_symbol_list() -> (tempfile::TempDir, ScanConfig) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stocks.txt"), "AAPL\nMSFT\n").unwrap();
        let config = scan_config(dir.path().to_path_buf());
        (dir, config)
    }

    #[test]
    fn test_config_from_env_defaults() {
        let config = ScanConfig::from_env().expect("Should parse with defaults");
        assert_eq!(config.top_n, 25);
        assert_eq!(config.history_to_use, 7);
        assert_eq!(config.granularity, Granularity::FifteenMin);
        assert_eq!(config.future_bars, 25);
        assert!(!config.is_test);
    }

    #[test]
    fn test_data_source_parsing() {
        assert_eq!(
            DataSource::from_str("yahoo_finance").unwrap(),
            DataSource::YahooFinance
        );
        assert_eq!(DataSource::from_str("BINANCE").unwrap(), DataSource::Binance);
        assert!(DataSource::from_str("bloomberg").is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("CLI").unwrap(), OutputFormat::Cli);
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("csv").is_err());
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        let (_dir, config) = config_with_symbol_list();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_holdout_in_test_mode() {
        let (_dir, mut config) = config_with_symbol_list();
        config.is_test = true;
        config.future_bars = 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::HoldoutTooShort { future_bars: 1 })
        );

        // Holdout length is irrelevant outside test mode
        config.is_test = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_symbol_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = scan_config(dir.path().to_path_buf());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSymbolList { .. })
        ));
    }

    #[test]
    fn test_validate_skips_symbol_list_when_replaying_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = scan_config(dir.path().to_path_buf());
        config.cache.load = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_granularity_the_provider_lacks() {
        let (_dir, mut config) = config_with_symbol_list();
        config.granularity = Granularity::TenMin;
        for source in [DataSource::YahooFinance, DataSource::Binance] {
            config.data_source = source;
            assert_eq!(
                config.validate(),
                Err(ConfigError::GranularityNotServed {
                    minutes: 10,
                    provider: source.name().to_string(),
                })
            );
        }

        config.granularity = Granularity::SixtyMin;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let (_dir, mut config) = config_with_symbol_list();
        config.history_to_use = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "history_to_use",
                ..
            })
        ));
    }
}
