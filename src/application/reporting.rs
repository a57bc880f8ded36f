//! Reporting utilities for scan results.
//!
//! Provides formatted console output and JSON export.

use crate::config::OutputFormat;
use crate::domain::scan::{EvaluationReport, RankedSymbol, RunMode, ScanReport};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Shortens large volumes: `950`, `12.35K`, `3.4M`.
pub fn humanize_volume(value: f64) -> String {
    if value < 1_000.0 {
        format!("{:.0}", value)
    } else if value < 1_000_000.0 {
        format!("{:.2}K", value / 1_000.0)
    } else {
        format!("{:.1}M", value / 1_000_000.0)
    }
}

fn humanize_optional(value: Option<f64>) -> String {
    value.map(humanize_volume).unwrap_or_else(|| "n/a".to_string())
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "n/a".to_string(),
    }
}

/// `results_<date>.json` for live runs, `results_future_<date>.json` for backtests
pub fn results_file_name(mode: RunMode, date: NaiveDate) -> String {
    let prefix = match mode {
        RunMode::Live => "results",
        RunMode::Backtest => "results_future",
    };
    format!("{}_{}.json", prefix, date.format("%Y-%m-%d"))
}

/// Reporter for scan output.
pub struct ScanReporter {
    output_dir: PathBuf,
}

impl ScanReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Emits the report in `format`; returns the written file for JSON output.
    ///
    /// The backtest evaluation summary is printed to the console in both formats.
    pub fn emit(
        &self,
        report: &ScanReport,
        format: OutputFormat,
        date: NaiveDate,
    ) -> Result<Option<PathBuf>> {
        let written = match format {
            OutputFormat::Cli => {
                self.print_ranked(&report.ranked);
                None
            }
            OutputFormat::Json => Some(self.export_json(report, date)?),
        };

        if let Some(evaluation) = &report.evaluation {
            self.print_evaluation(evaluation);
        }
        Ok(written)
    }

    pub fn print_ranked(&self, ranked: &[RankedSymbol]) {
        for result in ranked {
            println!("Last Bar Time: {}", result.latest_bar.format("%Y-%m-%d %H:%M:%S"));
            println!("Symbol: {}", result.symbol);
            println!("Anomaly Score: {:.3}", result.anomaly_score);
            println!("Today Volume: {}", humanize_volume(result.latest_day_volume));
            println!("Average Volume 5d: {}", humanize_optional(result.average_volume_5d));
            println!("Average Volume 20d: {}", humanize_optional(result.average_volume_20d));
            println!("Volatility 5bars: {:.3}", result.volatility_5_bars);
            println!("Volatility 20bars: {:.3}", result.volatility_20_bars);
            if let Some(change) = result.future_abs_sum_change_pct {
                println!("Future Absolute Sum Price Changes: {:.2}", change);
            }
            println!("{}", "-".repeat(22));
        }
    }

    pub fn print_evaluation(&self, evaluation: &EvaluationReport) {
        println!("\n{}", "=".repeat(60));
        println!("FUTURE PERFORMANCE");
        println!("{}", "=".repeat(60));
        println!(
            "Symbols evaluated:            {} ({} excluded)",
            evaluation.evaluated, evaluation.excluded
        );
        println!(
            "Correlation (score vs. future change, lower is better): {}",
            format_optional(evaluation.correlation, 2)
        );
        println!(
            "{:<28} | {:>10} | {:>10}",
            "", "Anomalous", "Normal"
        );
        println!("{}", "-".repeat(54));
        println!(
            "{:<28} | {:>10} | {:>10}",
            "Symbols", evaluation.anomalous.count, evaluation.normal.count
        );
        println!(
            "{:<28} | {:>10} | {:>10}",
            "Total absolute change",
            format_optional(evaluation.anomalous.mean_future_change, 3),
            format_optional(evaluation.normal.mean_future_change, 3)
        );
        println!(
            "{:<28} | {:>10} | {:>10}",
            "Future volatility",
            format_optional(evaluation.anomalous.mean_future_volatility, 3),
            format_optional(evaluation.normal.mean_future_volatility, 3)
        );
        println!(
            "{:<28} | {:>10} | {:>10}",
            "Historical volatility",
            format_optional(evaluation.anomalous.mean_historical_volatility, 3),
            format_optional(evaluation.normal.mean_historical_volatility, 3)
        );
    }

    /// Writes the ranked symbols as a pretty JSON array.
    pub fn export_json(&self, report: &ScanReport, date: NaiveDate) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create directory: {:?}", self.output_dir))?;
        let output_path = self.output_dir.join(results_file_name(report.mode, date));

        let json_output = serde_json::to_string_pretty(&report.ranked)
            .context("Failed to serialize results to JSON")?;
        write_file(&output_path, &json_output)?;

        info!("Results stored in {}", output_path.display());
        Ok(output_path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).context(format!("Failed to write results to {}", path.display()))
}
