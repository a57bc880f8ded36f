use super::indicators;
use super::trend::trend_summary;
use crate::domain::features::{FeatureVector, IndicatorFamily, IndicatorKey, IndicatorSet};
use crate::domain::market::PriceSeries;
use anyhow::Result;

/// Turns a historical price series into its indicator dictionary and feature
/// vector.
///
/// Pure and deterministic: the same bars and `history_to_use` always produce
/// bit-identical output.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    history_to_use: usize,
}

impl FeatureEngine {
    pub fn new(history_to_use: usize) -> Self {
        Self { history_to_use }
    }

    /// Computes every indicator of the current schema over `series`.
    pub fn compute_indicators(&self, series: &PriceSeries) -> Result<IndicatorSet> {
        let bars = series.bars();
        let mut set = IndicatorSet::new();

        for key in IndicatorKey::schema() {
            let values = match (key.family, key.lookback) {
                (IndicatorFamily::RelativeStrengthIndex, Some(n)) => indicators::rsi(bars, n)?,
                (IndicatorFamily::Stochastic, Some(n)) => indicators::stochastic_k(bars, n)?,
                (IndicatorFamily::EaseOfMovement, Some(n)) => {
                    indicators::ease_of_movement(bars, n)
                }
                (IndicatorFamily::CommodityChannelIndex, Some(n)) => {
                    indicators::commodity_channel_index(bars, n)
                }
                (IndicatorFamily::AccumulationDistribution, _) => {
                    indicators::accumulation_distribution(bars)
                }
                (IndicatorFamily::DailyLogReturn, _) => indicators::daily_log_return(bars),
                (IndicatorFamily::VolumeReturns, _) => indicators::volume_returns(bars),
                (family, None) => anyhow::bail!("Indicator {:?} requires a lookback", family),
            };
            set.insert(key, self.summarise(key.family, &values));
        }

        Ok(set)
    }

    /// Computes the indicator dictionary and the scored feature vector.
    pub fn extract(&self, series: &PriceSeries) -> Result<(IndicatorSet, FeatureVector)> {
        let indicators = self.compute_indicators(series)?;
        let vector = indicators.feature_vector();
        Ok((indicators, vector))
    }

    /// Last `history_to_use` values, then the trend triple over them
    fn summarise(&self, family: IndicatorFamily, values: &[f64]) -> Vec<f64> {
        let start = values.len().saturating_sub(self.history_to_use);
        let window = &values[start..];

        let mut stored = Vec::with_capacity(window.len() + 3);
        if family.stores_raw_window() {
            stored.extend_from_slice(window);
        }
        if family.stores_trend() {
            stored.extend_from_slice(&trend_summary(window).to_array());
        }
        stored
    }
}
