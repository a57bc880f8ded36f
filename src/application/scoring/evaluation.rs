//! Backtest evaluation: did low scores precede larger moves?

use crate::domain::market::PriceSeries;
use crate::domain::scan::{BacktestRecord, EvaluationReport, GroupStats};
use statrs::statistics::Statistics;

/// Future changes above this many percent are treated as provider artifacts
/// (unadjusted splits) and left out of the evaluation.
pub const SANITY_THRESHOLD_PCT: f64 = 250.0;

/// What happened after the reference bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuturePerformance {
    /// Absolute value of the summed percentage changes from the reference close
    pub abs_sum_change_pct: f64,
    /// Population standard deviation of the non-zero future closes
    pub volatility: f64,
}

/// Measures the held-out bars against the first future bar's close.
///
/// An empty future yields NaN for both fields.
pub fn future_performance(future: &PriceSeries) -> FuturePerformance {
    let Some((reference, rest)) = future.bars().split_first() else {
        return FuturePerformance {
            abs_sum_change_pct: f64::NAN,
            volatility: f64::NAN,
        };
    };

    let alert_close = reference.close;
    let later: Vec<f64> = rest
        .iter()
        .map(|bar| bar.close)
        .filter(|close| *close != 0.0)
        .collect();

    let summed: f64 = later
        .iter()
        .map(|close| (close - alert_close) * 100.0 / alert_close)
        .sum();

    FuturePerformance {
        abs_sum_change_pct: summed.abs(),
        volatility: later.iter().population_std_dev(),
    }
}

/// Pearson correlation; `None` with fewer than two points or zero variance
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut x_var = 0.0;
    let mut y_var = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        covariance += dx * dy;
        x_var += dx * dx;
        y_var += dy * dy;
    }

    if x_var == 0.0 || y_var == 0.0 {
        return None;
    }
    Some((covariance / (x_var * y_var).sqrt()).clamp(-1.0, 1.0))
}

struct EvaluatedSymbol {
    score: f64,
    future_change: f64,
    future_volatility: f64,
    historical_volatility: f64,
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        None
    } else {
        Some(values.mean())
    }
}

fn group_stats<'a>(members: impl Iterator<Item = &'a EvaluatedSymbol> + Clone) -> GroupStats {
    GroupStats {
        count: members.clone().count(),
        mean_future_change: mean_of(members.clone().map(|m| m.future_change)),
        mean_future_volatility: mean_of(members.clone().map(|m| m.future_volatility)),
        mean_historical_volatility: mean_of(members.map(|m| m.historical_volatility)),
    }
}

/// Correlates scores with future movement over every ranked symbol and
/// compares the anomalous (score < 0) and normal groups.
pub fn evaluate(records: &[BacktestRecord]) -> EvaluationReport {
    let mut evaluated = Vec::with_capacity(records.len());
    for record in records {
        let performance = future_performance(&record.future);
        let change = performance.abs_sum_change_pct;
        if change.is_nan() || record.score.is_nan() || change.abs() > SANITY_THRESHOLD_PCT {
            continue;
        }
        evaluated.push(EvaluatedSymbol {
            score: record.score,
            future_change: change,
            future_volatility: performance.volatility,
            historical_volatility: record.historical.closes().population_std_dev(),
        });
    }

    let scores: Vec<f64> = evaluated.iter().map(|e| e.score).collect();
    let changes: Vec<f64> = evaluated.iter().map(|e| e.future_change).collect();

    EvaluationReport {
        evaluated: evaluated.len(),
        excluded: records.len() - evaluated.len(),
        correlation: pearson_correlation(&scores, &changes),
        anomalous: group_stats(evaluated.iter().filter(|e| e.score < 0.0)),
        normal: group_stats(evaluated.iter().filter(|e| e.score >= 0.0)),
    }
}
