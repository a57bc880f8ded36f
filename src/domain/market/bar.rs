use crate::domain::errors::SymbolRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl ta::Open for Bar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Bars of one symbol, strictly ascending by timestamp.
///
/// Construction validates ordering, duplicate timestamps and volume sign, so
/// every `PriceSeries` in the pipeline is well-formed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, SymbolRejection> {
        for (i, bar) in bars.iter().enumerate() {
            let prices = [bar.open, bar.high, bar.low, bar.close];
            if prices.iter().any(|p| !p.is_finite()) {
                return Err(SymbolRejection::Malformed {
                    reason: format!("bar {} has a non-finite price", i),
                });
            }
            if bar.volume.is_nan() || bar.volume < 0.0 {
                return Err(SymbolRejection::Malformed {
                    reason: format!("bar {} has invalid volume {}", i, bar.volume),
                });
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(SymbolRejection::Malformed {
                    reason: format!(
                        "bar {} at {} is not after previous bar at {}",
                        i,
                        bar.timestamp,
                        bars[i - 1].timestamp
                    ),
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Drops the leading bar, which providers tend to deliver half-formed.
    pub fn without_first_bar(mut self) -> Self {
        if !self.bars.is_empty() {
            self.bars.remove(0);
        }
        self
    }

    /// Splits off the last `future_bars + 1` bars as the held-out future.
    ///
    /// Returns `(historical, future)`. The first future bar is the reference
    /// bar the evaluation measures changes against; it is never part of the
    /// historical series.
    pub fn split_holdout(self, future_bars: usize) -> Result<(Self, Self), SymbolRejection> {
        let withheld = future_bars + 1;
        if self.bars.len() <= withheld {
            return Err(SymbolRejection::TooShort {
                available: self.bars.len(),
                required: withheld,
            });
        }

        let mut historical = self.bars;
        let future = historical.split_off(historical.len() - withheld);
        Ok((Self { bars: historical }, Self { bars: future }))
    }
}

impl TryFrom<Vec<Bar>> for PriceSeries {
    type Error = SymbolRejection;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<Bar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}
