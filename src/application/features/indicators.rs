//! Indicator value series over a full price history.
//!
//! Every function returns one value per input bar unless noted otherwise.
//! Warm-up positions and undefined results (division by zero, missing
//! previous bar) are filled with 0.

use crate::domain::market::Bar;
use anyhow::{Result, anyhow};
use ta::Next;
use ta::indicators::{FastStochastic, RelativeStrengthIndex};

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Zeroes the first `period - 1` values, where the indicator has not seen a
/// full window yet.
fn zero_warm_up(mut values: Vec<f64>, period: usize) -> Vec<f64> {
    let warm_up = period.saturating_sub(1).min(values.len());
    values[..warm_up].iter_mut().for_each(|v| *v = 0.0);
    values
}

/// Relative strength index of closes with Wilder smoothing.
///
/// An EMA over `2n - 1` periods has the Wilder factor `1/n`.
pub fn rsi(bars: &[Bar], period: usize) -> Result<Vec<f64>> {
    let mut indicator = RelativeStrengthIndex::new((2 * period).saturating_sub(1))
        .map_err(|e| anyhow!("Invalid RSI period {}: {:?}", period, e))?;
    let values = bars
        .iter()
        .map(|bar| finite_or_zero(indicator.next(bar.close)))
        .collect();
    Ok(zero_warm_up(values, period))
}

/// Stochastic oscillator %K
pub fn stochastic_k(bars: &[Bar], period: usize) -> Result<Vec<f64>> {
    let mut indicator = FastStochastic::new(period)
        .map_err(|e| anyhow!("Invalid stochastic period {}: {:?}", period, e))?;
    let values = bars
        .iter()
        .map(|bar| finite_or_zero(indicator.next(bar)))
        .collect();
    Ok(zero_warm_up(values, period))
}

/// Accumulation/distribution line: running sum of money flow volume
pub fn accumulation_distribution(bars: &[Bar]) -> Vec<f64> {
    let mut total = 0.0;
    bars.iter()
        .map(|bar| {
            let range = bar.high - bar.low;
            if range != 0.0 {
                let multiplier = ((bar.close - bar.low) - (bar.high - bar.close)) / range;
                total += finite_or_zero(multiplier * bar.volume);
            }
            total
        })
        .collect()
}

/// Ease of movement, smoothed with a simple moving average of `period`.
pub fn ease_of_movement(bars: &[Bar], period: usize) -> Vec<f64> {
    let raw: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return f64::NAN;
            }
            let prev = &bars[i - 1];
            let distance = (bar.high - prev.high) + (bar.low - prev.low);
            distance * (bar.high - bar.low) / (2.0 * bar.volume) * 1e8
        })
        .collect();

    rolling_mean(&raw, period)
        .into_iter()
        .map(finite_or_zero)
        .collect()
}

/// Commodity channel index of the typical price, scaled by `0.015`.
pub fn commodity_channel_index(bars: &[Bar], period: usize) -> Vec<f64> {
    const SCALE: f64 = 0.015;

    let typical: Vec<f64> = bars
        .iter()
        .map(|bar| (bar.high + bar.low + bar.close) / 3.0)
        .collect();

    (0..typical.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return 0.0;
            }
            let window = &typical[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let mean_deviation =
                window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            finite_or_zero((typical[i] - mean) / (SCALE * mean_deviation))
        })
        .collect()
}

/// Log return of consecutive closes, in percent
pub fn daily_log_return(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                return 0.0;
            }
            finite_or_zero((bar.close / bars[i - 1].close).ln() * 100.0)
        })
        .collect()
}

/// Ratio of each volume to the previous one.
///
/// Zero-volume bars are removed first, so the result never divides by zero
/// and has fewer values than there are bars.
pub fn volume_returns(bars: &[Bar]) -> Vec<f64> {
    let volumes: Vec<f64> = bars
        .iter()
        .map(|bar| bar.volume)
        .filter(|v| *v != 0.0)
        .collect();
    volumes.windows(2).map(|pair| pair[1] / pair[0]).collect()
}

/// Simple moving average; positions without a full window of finite values are NaN.
fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return f64::NAN;
            }
            values[i + 1 - period..=i].iter().sum::<f64>() / period as f64
        })
        .collect()
}
