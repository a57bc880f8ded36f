use crate::domain::errors::SymbolRejection;
use crate::domain::market::PriceSeries;
use statrs::statistics::Statistics;

/// Bars averaged by the volume filter
pub const VOLUME_WINDOW: usize = 30;

/// Population standard deviation of the non-zero closes.
///
/// Zero closes are provider gaps, not prices.
pub fn close_volatility(series: &PriceSeries) -> f64 {
    series
        .bars()
        .iter()
        .map(|bar| bar.close)
        .filter(|close| *close != 0.0)
        .population_std_dev()
}

/// Keeps the series only when its close volatility is strictly above `threshold`.
pub fn check_volatility(series: &PriceSeries, threshold: f64) -> Result<f64, SymbolRejection> {
    let volatility = close_volatility(series);
    if volatility > threshold {
        Ok(volatility)
    } else {
        Err(SymbolRejection::LowVolatility {
            volatility,
            threshold,
        })
    }
}

/// Rejects series whose mean volume over the last [`VOLUME_WINDOW`] bars is
/// below `minimum`.
pub fn check_volume(series: &PriceSeries, minimum: f64) -> Result<f64, SymbolRejection> {
    let bars = series.bars();
    let start = bars.len().saturating_sub(VOLUME_WINDOW);
    let average = bars[start..].iter().map(|bar| bar.volume).mean();

    if average.is_nan() || average < minimum {
        Err(SymbolRejection::LowVolume {
            average,
            minimum,
            window: VOLUME_WINDOW,
        })
    } else {
        Ok(average)
    }
}
