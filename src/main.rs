//! Surpriver command line entry point.
//!
//! Configuration comes from the environment (and `.env`); every run parameter
//! can be overridden with a flag.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use surpriver::application::reporting::ScanReporter;
use surpriver::config::{DataSource, OutputFormat, ScanConfig};
use surpriver::domain::market::Granularity;
use surpriver::infrastructure::ServiceFactory;
use surpriver::infrastructure::symbols::load_symbols;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Find symbols with unusual recent price and volume behaviour",
    long_about = None
)]
struct Cli {
    /// Number of most anomalous symbols to report
    #[arg(long)]
    top_n: Option<usize>,

    /// Minimum average volume over the last 30 bars
    #[arg(long)]
    min_volume: Option<f64>,

    /// Number of recent bars summarised per indicator
    #[arg(long)]
    history_to_use: Option<usize>,

    /// Bar size in minutes (1, 5, 10, 15, 30, 60)
    #[arg(long)]
    data_granularity_minutes: Option<u32>,

    /// Hold out the last bars and evaluate the ranking against them
    #[arg(long)]
    is_test: bool,

    /// Number of bars held out in test mode
    #[arg(long)]
    future_bars: Option<usize>,

    /// Minimum close-price volatility
    #[arg(long)]
    volatility_filter: Option<f64>,

    /// Output format (cli, json)
    #[arg(long)]
    output_format: Option<String>,

    /// Directory JSON results are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory holding the symbol list
    #[arg(long)]
    stocks_dir: Option<PathBuf>,

    /// Symbol list file name inside the stocks directory
    #[arg(long)]
    stock_list: Option<String>,

    /// Market data provider (yahoo_finance, binance)
    #[arg(long)]
    data_source: Option<String>,

    /// Replay the feature cache instead of querying the provider
    #[arg(long)]
    load_from_cache: bool,

    /// Do not write accepted symbols to the feature cache
    #[arg(long)]
    no_save_cache: bool,

    /// Feature cache database URL
    #[arg(long)]
    cache_db_url: Option<String>,

    /// Maximum concurrent provider requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Wall-clock budget for acquisition, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Seed for the isolation forest
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    /// Applies command line overrides on top of the environment configuration.
    fn apply(self, config: &mut ScanConfig) -> Result<()> {
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if let Some(min_volume) = self.min_volume {
            config.min_volume = min_volume;
        }
        if let Some(history_to_use) = self.history_to_use {
            config.history_to_use = history_to_use;
        }
        if let Some(minutes) = self.data_granularity_minutes {
            config.granularity = Granularity::from_minutes(minutes)?;
        }
        if self.is_test {
            config.is_test = true;
        }
        if let Some(future_bars) = self.future_bars {
            config.future_bars = future_bars;
        }
        if let Some(threshold) = self.volatility_filter {
            config.volatility_threshold = threshold;
        }
        if let Some(format) = self.output_format {
            config.output_format = OutputFormat::from_str(&format)?;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(stocks_dir) = self.stocks_dir {
            config.stocks_dir = stocks_dir;
        }
        if let Some(stock_list) = self.stock_list {
            config.stock_list = stock_list;
        }
        if let Some(source) = self.data_source {
            config.data_source = DataSource::from_str(&source)?;
        }
        if self.load_from_cache {
            config.cache.load = true;
        }
        if self.no_save_cache {
            config.cache.save = false;
        }
        if let Some(db_url) = self.cache_db_url {
            config.cache.db_url = db_url;
        }
        if let Some(concurrency) = self.concurrency {
            config.acquisition_concurrency = concurrency;
        }
        if let Some(deadline) = self.deadline_secs {
            config.run_deadline_secs = Some(deadline);
        }
        if let Some(seed) = self.seed {
            config.isolation_seed = seed;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let mut config = ScanConfig::from_env().context("Failed to load configuration")?;
    cli.apply(&mut config)?;
    config.validate()?;

    info!(
        "Surpriver starting: {:?} mode, {:?} bars from {:?}, top {}",
        config.run_mode(),
        config.granularity,
        config.data_source,
        config.top_n
    );

    let symbols = if config.cache.load {
        Vec::new()
    } else {
        load_symbols(&config.symbol_list_path())?
    };

    let reporter = ScanReporter::new(config.output_dir.clone());
    let output_format = config.output_format;
    let scanner = ServiceFactory::build_scanner(config).await?;
    let report = scanner.run(&symbols).await?;

    info!(
        "{} symbols survived, reporting {}",
        report.surviving_symbols,
        report.ranked.len()
    );
    reporter.emit(&report, output_format, Utc::now().date_naive())?;

    Ok(())
}
