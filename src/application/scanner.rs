//! Scan orchestrator
//!
//! Runs the pipeline in strict order: acquisition (live or cache replay),
//! scoring over the full feature matrix, ranking, and in test mode the
//! backtest checks and evaluation.

use crate::application::acquisition::{AcquisitionEngine, AcquisitionOutcome};
use crate::application::scoring::{IsolationForestConfig, annotate, evaluate, rank, score_vectors};
use crate::config::ScanConfig;
use crate::domain::errors::ScanError;
use crate::domain::scan::{BacktestRecord, RunMode, ScanReport};
use tracing::{info, warn};

pub struct Scanner {
    config: ScanConfig,
    acquisition: AcquisitionEngine,
}

impl Scanner {
    pub fn new(config: ScanConfig, acquisition: AcquisitionEngine) -> Self {
        Self {
            config,
            acquisition,
        }
    }

    /// Runs a full scan over `symbols`.
    ///
    /// `symbols` is ignored when replaying the feature cache.
    pub async fn run(&self, symbols: &[String]) -> Result<ScanReport, ScanError> {
        self.config.validate()?;

        let outcome = if self.config.cache.load {
            self.acquisition.load_from_cache().await?
        } else {
            self.acquisition.acquire(symbols).await?
        };
        self.score(outcome)
    }

    /// Scores and ranks an acquisition outcome.
    pub fn score(&self, outcome: AcquisitionOutcome) -> Result<ScanReport, ScanError> {
        if outcome.symbols.is_empty() {
            return Err(ScanError::EmptyFeatureMatrix);
        }
        let surviving_symbols = outcome.symbols.len();

        let forest = IsolationForestConfig {
            n_trees: self.config.isolation_trees,
            seed: self.config.isolation_seed,
            ..IsolationForestConfig::default()
        };
        let scores = score_vectors(&outcome.features(), forest)?;
        info!(
            "Scored {} symbols with {} isolation trees",
            surviving_symbols, forest.n_trees
        );

        let records = rank(outcome.symbols, &scores);
        let mode = self.config.run_mode();
        if mode == RunMode::Backtest {
            self.check_holdout(&records)?;
        }

        let top_n = self.config.top_n.min(records.len());
        let with_future = mode == RunMode::Backtest;
        let ranked = records[..top_n]
            .iter()
            .filter_map(|record| {
                let annotated = annotate(record, with_future);
                if annotated.is_none() {
                    warn!("Skipping {}: no historical bars to annotate", record.symbol);
                }
                annotated
            })
            .collect();

        let evaluation = with_future.then(|| evaluate(&records));

        Ok(ScanReport {
            mode,
            surviving_symbols,
            ranked,
            evaluation,
        })
    }

    /// Test mode must be able to evaluate every symbol it reports.
    fn check_holdout(&self, records: &[BacktestRecord]) -> Result<(), ScanError> {
        if records.len() < self.config.top_n {
            return Err(ScanError::InsufficientRankedSymbols {
                requested: self.config.top_n,
                available: records.len(),
            });
        }

        let required = self.config.future_bars + 1;
        for record in &records[..self.config.top_n] {
            if record.future.len() < required {
                return Err(ScanError::InsufficientFutureData {
                    symbol: record.symbol.clone(),
                    available: record.future.len(),
                    required,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::acquisition::{AcquiredSymbol, AcquisitionSettings};
    use crate::application::features::FeatureEngine;
    use crate::config::test_support::scan_config;
    use crate::domain::market::PriceSeries;
    use crate::domain::market::bar::test_support::bar_at;
    use std::path::PathBuf;

    fn acquired(symbol: &str, phase: f64, future_bars: usize) -> AcquiredSymbol {
        let bars = (0..120)
            .map(|i| bar_at(i, 30.0 + ((i as f64) * 0.4 + phase).sin(), 1000.0 + i as f64))
            .collect();
        let series = PriceSeries::new(bars).unwrap();
        let (historical, future) = if future_bars > 0 {
            series.split_holdout(future_bars).unwrap()
        } else {
            (series, PriceSeries::empty())
        };
        let (indicators, features) = FeatureEngine::new(7).extract(&historical).unwrap();
        AcquiredSymbol {
            symbol: symbol.to_string(),
            features,
            indicators,
            historical,
            future,
            bar_count: 120,
        }
    }

    fn scanner(config: ScanConfig) -> Scanner {
        let acquisition = AcquisitionEngine::builder()
            .history_to_use(config.history_to_use)
            .settings(AcquisitionSettings::from_config(&config))
            .build()
            .unwrap();
        Scanner::new(config, acquisition)
    }

    fn outcome(symbols: Vec<AcquiredSymbol>) -> AcquisitionOutcome {
        AcquisitionOutcome {
            symbols,
            ..AcquisitionOutcome::default()
        }
    }

    #[test]
    fn test_empty_outcome_is_fatal() {
        let scanner = scanner(scan_config(PathBuf::from(".")));
        assert!(matches!(
            scanner.score(outcome(Vec::new())),
            Err(ScanError::EmptyFeatureMatrix)
        ));
    }

    #[test]
    fn test_live_scan_reports_top_n_ascending() {
        let mut config = scan_config(PathBuf::from("."));
        config.top_n = 3;
        let symbols = (0..8)
            .map(|i| acquired(&format!("S{}", i), i as f64 * 0.7, 0))
            .collect();

        let report = scanner(config).score(outcome(symbols)).unwrap();
        assert_eq!(report.mode, RunMode::Live);
        assert_eq!(report.surviving_symbols, 8);
        assert_eq!(report.ranked.len(), 3);
        assert!(report.evaluation.is_none());
        assert!(
            report
                .ranked
                .windows(2)
                .all(|w| w[0].anomaly_score <= w[1].anomaly_score)
        );
        assert!(report.ranked[0].future_abs_sum_change_pct.is_none());
    }

    #[test]
    fn test_backtest_with_too_few_survivors_is_fatal() {
        let mut config = scan_config(PathBuf::from("."));
        config.is_test = true;
        config.future_bars = 10;
        config.top_n = 5;
        let symbols = (0..3)
            .map(|i| acquired(&format!("S{}", i), i as f64, 10))
            .collect();

        assert!(matches!(
            scanner(config).score(outcome(symbols)),
            Err(ScanError::InsufficientRankedSymbols {
                requested: 5,
                available: 3
            })
        ));
    }

    #[test]
    fn test_backtest_without_future_bars_is_fatal() {
        let mut config = scan_config(PathBuf::from("."));
        config.is_test = true;
        config.future_bars = 10;
        config.top_n = 2;
        // Acquired as a live run, so no future bars were kept
        let symbols = (0..4)
            .map(|i| acquired(&format!("S{}", i), i as f64, 0))
            .collect();

        assert!(matches!(
            scanner(config).score(outcome(symbols)),
            Err(ScanError::InsufficientFutureData { .. })
        ));
    }

    #[test]
    fn test_backtest_produces_evaluation() {
        let mut config = scan_config(PathBuf::from("."));
        config.is_test = true;
        config.future_bars = 10;
        config.top_n = 4;
        let symbols = (0..6)
            .map(|i| acquired(&format!("S{}", i), i as f64 * 0.9, 10))
            .collect();

        let report = scanner(config).score(outcome(symbols)).unwrap();
        assert_eq!(report.mode, RunMode::Backtest);
        assert_eq!(report.ranked.len(), 4);
        assert!(report.ranked.iter().all(|r| r.future_abs_sum_change_pct.is_some()));
        let evaluation = report.evaluation.unwrap();
        assert_eq!(evaluation.evaluated + evaluation.excluded, 6);
    }
}
