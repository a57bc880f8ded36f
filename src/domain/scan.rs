use crate::domain::market::PriceSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a scan predicts live or replays a held-out future
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Live,
    Backtest,
}

/// A scored symbol with the data the evaluation needs
#[derive(Debug, Clone)]
pub struct BacktestRecord {
    pub symbol: String,
    pub score: f64,
    pub historical: PriceSeries,
    pub future: PriceSeries,
}

/// One line of scan output, most anomalous first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSymbol {
    pub symbol: String,
    pub anomaly_score: f64,
    pub latest_bar: DateTime<Utc>,
    pub latest_day_volume: f64,
    pub average_volume_5d: Option<f64>,
    pub average_volume_20d: Option<f64>,
    pub volatility_5_bars: f64,
    pub volatility_20_bars: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub future_abs_sum_change_pct: Option<f64>,
}

/// Averages over one side of the anomalous/normal split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean_future_change: Option<f64>,
    pub mean_future_volatility: Option<f64>,
    pub mean_historical_volatility: Option<f64>,
}

/// Whether low scores preceded larger moves in the held-out future
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub evaluated: usize,
    pub excluded: usize,
    /// Pearson correlation of score vs. future change; negative is good
    pub correlation: Option<f64>,
    pub anomalous: GroupStats,
    pub normal: GroupStats,
}

/// Everything a scan produces
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub mode: RunMode,
    pub surviving_symbols: usize,
    pub ranked: Vec<RankedSymbol>,
    pub evaluation: Option<EvaluationReport>,
}
