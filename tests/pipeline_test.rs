mod common;

use common::*;
use surpriver::application::reporting::ScanReporter;
use surpriver::config::OutputFormat;
use surpriver::domain::errors::ScanError;
use surpriver::domain::market::Bar;
use surpriver::domain::scan::RunMode;
use surpriver::infrastructure::mock::MockMarketDataProvider;

fn provider_for(symbols: &[String], bars_for: impl Fn(usize) -> Vec<Bar>) -> MockMarketDataProvider {
    symbols
        .iter()
        .enumerate()
        .fold(MockMarketDataProvider::new(), |provider, (i, symbol)| {
            provider.with_bars(symbol, bars_for(i))
        })
}

#[tokio::test]
async fn test_symbols_with_minority_bar_count_are_dropped() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(10);
    let config = config_in(dir.path(), &symbols);

    // SYM03 and SYM07 return 480 bars, everyone else 500
    let provider = provider_for(&symbols, |i| {
        let count = if i == 3 || i == 7 { 480 } else { 500 };
        oscillating_bars(count, i as f64 * 0.05)
    });

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    assert_eq!(report.surviving_symbols, 8);
    assert_eq!(report.ranked.len(), 5);
    assert!(
        report
            .ranked
            .iter()
            .all(|r| r.symbol != "SYM03" && r.symbol != "SYM07")
    );
}

#[tokio::test]
async fn test_breakout_symbol_ranks_first() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(12);
    let config = config_in(dir.path(), &symbols);

    let provider = provider_for(&symbols, |i| {
        if i == 5 {
            breakout_bars(300)
        } else {
            oscillating_bars(300, i as f64 * 0.01)
        }
    });

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::Live);
    assert_eq!(report.ranked[0].symbol, "SYM05");
    assert!(report.ranked[0].anomaly_score < report.ranked[1].anomaly_score);
    assert!(report.ranked[0].anomaly_score < 0.0);
}

#[tokio::test]
async fn test_repeated_scans_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(10);
    let config = config_in(dir.path(), &symbols);
    let provider = provider_for(&symbols, |i| oscillating_bars(200, i as f64 * 0.3));

    let first = scanner(config.clone(), Some(provider.clone()), None)
        .run(&symbols)
        .await
        .unwrap();
    let second = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    assert_eq!(first.ranked, second.ranked);
}

#[tokio::test]
async fn test_backtest_with_fewer_survivors_than_top_n_fails() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(3);
    let mut config = config_in(dir.path(), &symbols);
    config.is_test = true;
    config.future_bars = 10;
    config.top_n = 5;
    let provider = provider_for(&symbols, |i| oscillating_bars(200, i as f64));

    let result = scanner(config, Some(provider), None).run(&symbols).await;
    assert!(matches!(
        result,
        Err(ScanError::InsufficientRankedSymbols {
            requested: 5,
            available: 3
        })
    ));
}

#[tokio::test]
async fn test_backtest_reports_future_change_and_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(10);
    let mut config = config_in(dir.path(), &symbols);
    config.is_test = true;
    config.future_bars = 10;
    config.top_n = 4;
    let provider = provider_for(&symbols, |i| oscillating_bars(200, i as f64 * 0.4));

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::Backtest);
    assert_eq!(report.ranked.len(), 4);
    assert!(
        report
            .ranked
            .iter()
            .all(|r| r.future_abs_sum_change_pct.is_some())
    );

    let evaluation = report.evaluation.unwrap();
    assert_eq!(evaluation.evaluated + evaluation.excluded, 10);
    assert_eq!(
        evaluation.anomalous.count + evaluation.normal.count,
        evaluation.evaluated
    );
}

#[tokio::test]
async fn test_zero_volume_bars_do_not_poison_features() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(8);
    let config = config_in(dir.path(), &symbols);

    let provider = provider_for(&symbols, |i| {
        let mut bars = oscillating_bars(200, i as f64 * 0.2);
        if i == 2 {
            for bar in bars.iter_mut().skip(100).take(20) {
                bar.volume = 0.0;
            }
        }
        bars
    });

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    assert_eq!(report.surviving_symbols, 8);
    assert!(report.ranked.iter().all(|r| r.anomaly_score.is_finite()));
}

#[tokio::test]
async fn test_failed_and_unknown_symbols_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut symbols = symbols(8);
    symbols.push("DELISTED".to_string());
    symbols.push("BROKEN".to_string());
    let config = config_in(dir.path(), &symbols);

    let provider = provider_for(&symbols[..8], |i| oscillating_bars(200, i as f64 * 0.2))
        .with_failure("BROKEN", "HTTP 500");

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();
    assert_eq!(report.surviving_symbols, 8);
}

#[tokio::test]
async fn test_json_output_lists_top_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(9);
    let config = config_in(dir.path(), &symbols);
    let output_dir = config.output_dir.clone();
    let provider = provider_for(&symbols, |i| oscillating_bars(200, i as f64 * 0.3));

    let report = scanner(config, Some(provider), None)
        .run(&symbols)
        .await
        .unwrap();

    let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
    let path = ScanReporter::new(output_dir)
        .emit(&report, OutputFormat::Json, date)
        .unwrap()
        .unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let entries = written.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["symbol"], report.ranked[0].symbol.as_str());
    assert!(entries[0].get("anomaly_score").is_some());
    assert!(entries[0].get("future_abs_sum_change_pct").is_none());
}

#[tokio::test]
async fn test_missing_symbol_list_is_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let symbols = symbols(3);
    let mut config = config_in(dir.path(), &symbols);
    config.stock_list = "absent.txt".to_string();
    let provider = MockMarketDataProvider::new();

    let result = scanner(config, Some(provider.clone()), None)
        .run(&symbols)
        .await;
    assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    assert_eq!(provider.calls(), 0);
}
