use super::evaluation::future_performance;
use crate::application::acquisition::AcquiredSymbol;
use crate::domain::market::PriceSeries;
use crate::domain::scan::{BacktestRecord, RankedSymbol};
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Pairs symbols with their scores and sorts most anomalous first.
///
/// Ties keep acquisition order; NaN scores sort last.
pub fn rank(symbols: Vec<AcquiredSymbol>, scores: &[f64]) -> Vec<BacktestRecord> {
    let mut records: Vec<BacktestRecord> = symbols
        .into_iter()
        .zip(scores.iter().copied())
        .map(|(acquired, score)| BacktestRecord {
            symbol: acquired.symbol,
            score,
            historical: acquired.historical,
            future: acquired.future,
        })
        .collect();

    records.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => a.score.total_cmp(&b.score),
        (nan_a, nan_b) => nan_a.cmp(&nan_b),
    });
    records
}

/// Volume summed per UTC calendar date, most recent date first
pub fn daily_volumes(series: &PriceSeries) -> Vec<(NaiveDate, f64)> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for bar in series.bars() {
        *by_date.entry(bar.timestamp.date_naive()).or_insert(0.0) += bar.volume;
    }
    by_date.into_iter().rev().collect()
}

/// Mean daily volume over up to `days` dates preceding the latest one
fn prior_average(daily: &[(NaiveDate, f64)], days: usize) -> Option<f64> {
    let prior: Vec<f64> = daily.iter().skip(1).take(days).map(|(_, v)| *v).collect();
    if prior.is_empty() {
        None
    } else {
        Some(prior.mean())
    }
}

/// Population standard deviation of the last `bars` closes
pub fn recent_volatility(series: &PriceSeries, bars: usize) -> f64 {
    let closes = series.closes();
    let start = closes.len().saturating_sub(bars);
    closes[start..].iter().population_std_dev()
}

/// Builds the result line for a ranked record.
///
/// Returns `None` for a record without historical bars.
pub fn annotate(record: &BacktestRecord, with_future: bool) -> Option<RankedSymbol> {
    let latest_bar = record.historical.last()?.timestamp;
    let daily = daily_volumes(&record.historical);
    let latest_day_volume = daily.first().map(|(_, v)| *v).unwrap_or(0.0);

    Some(RankedSymbol {
        symbol: record.symbol.clone(),
        anomaly_score: record.score,
        latest_bar,
        latest_day_volume,
        average_volume_5d: prior_average(&daily, 5),
        average_volume_20d: prior_average(&daily, 20),
        volatility_5_bars: recent_volatility(&record.historical, 5),
        volatility_20_bars: recent_volatility(&record.historical, 20),
        future_abs_sum_change_pct: with_future
            .then(|| future_performance(&record.future).abs_sum_change_pct),
    })
}
