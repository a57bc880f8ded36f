#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use surpriver::application::acquisition::{AcquisitionEngine, AcquisitionSettings};
use surpriver::application::scanner::Scanner;
use surpriver::config::{
    BinanceConfig, CacheEnvConfig, DataSource, OutputFormat, ProviderEnvConfig, ScanConfig,
    YahooConfig,
};
use surpriver::domain::market::{Bar, Granularity};
use surpriver::domain::repositories::FeatureCacheRepository;
use surpriver::infrastructure::mock::MockMarketDataProvider;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// Writes `symbols` to `stocks.txt` in `dir` and returns a configuration
/// pointing at it, independent of the process environment.
pub fn config_in(dir: &Path, symbols: &[String]) -> ScanConfig {
    std::fs::write(dir.join("stocks.txt"), symbols.join("\n")).unwrap();
    ScanConfig {
        top_n: 5,
        history_to_use: 7,
        data_source: DataSource::YahooFinance,
        granularity: Granularity::FifteenMin,
        min_volume: 0.0,
        volatility_threshold: 0.0,
        stocks_dir: dir.to_path_buf(),
        stock_list: "stocks.txt".to_string(),
        is_test: false,
        future_bars: 25,
        output_format: OutputFormat::Json,
        output_dir: dir.join("results"),
        acquisition_concurrency: 4,
        symbol_timeout_secs: 5,
        run_deadline_secs: None,
        isolation_trees: 100,
        isolation_seed: 7,
        providers: ProviderEnvConfig {
            yahoo: YahooConfig {
                base_url: "http://localhost".to_string(),
            },
            binance: BinanceConfig {
                base_url: "http://localhost".to_string(),
            },
            http_timeout_secs: 5,
            http_max_retries: 0,
        },
        cache: CacheEnvConfig {
            save: false,
            db_url: format!("sqlite://{}", dir.join("features.db").display()),
            ..CacheEnvConfig::default()
        },
    }
}

/// `count` quarter-hour bars of a gently oscillating series. `phase` shifts
/// the oscillation so symbols differ slightly.
pub fn oscillating_bars(count: usize, phase: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 50.0 + 2.0 * (x * 0.3 + phase).sin() + 0.001 * x;
            bar(i, close, 20_000.0 + 500.0 * (x * 0.2 + phase).cos())
        })
        .collect()
}

/// Like `oscillating_bars`, but the final bars break out on heavy volume.
pub fn breakout_bars(count: usize) -> Vec<Bar> {
    let mut bars = oscillating_bars(count, 0.0);
    let start = count - 10;
    for (offset, bar) in bars[start..].iter_mut().enumerate() {
        let close = bar.close * (1.0 + 0.04 * (offset + 1) as f64);
        bar.open = close * 0.98;
        bar.high = close * 1.03;
        bar.low = close * 0.97;
        bar.close = close;
        bar.volume *= 1.0 + 4.0 * (offset + 1) as f64;
    }
    bars
}

pub fn bar(index: usize, close: f64, volume: f64) -> Bar {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
    Bar {
        timestamp: start + Duration::minutes(15 * index as i64),
        open: close * 0.999,
        high: close * 1.005,
        low: close * 0.995,
        close,
        volume,
    }
}

pub fn symbols(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("SYM{:02}", i)).collect()
}

pub fn scanner(
    config: ScanConfig,
    provider: Option<MockMarketDataProvider>,
    cache: Option<Arc<dyn FeatureCacheRepository>>,
) -> Scanner {
    let mut builder = AcquisitionEngine::builder()
        .history_to_use(config.history_to_use)
        .settings(AcquisitionSettings::from_config(&config));
    if let Some(provider) = provider {
        builder = builder.provider(Arc::new(provider));
    }
    if let Some(cache) = cache {
        builder = builder.cache(cache, config.cache.save);
    }
    Scanner::new(config, builder.build().unwrap())
}
