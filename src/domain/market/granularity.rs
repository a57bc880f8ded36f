use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar granularities accepted by the scanner, in minutes
pub const SUPPORTED_MINUTES: [u32; 6] = [1, 5, 10, 15, 30, 60];

/// Time span covered by each bar of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneMin,
    FiveMin,
    TenMin,
    FifteenMin,
    ThirtyMin,
    SixtyMin,
}

impl Granularity {
    /// Parses a minute count into one of the supported granularities
    pub fn from_minutes(minutes: u32) -> Result<Self, ConfigError> {
        match minutes {
            1 => Ok(Granularity::OneMin),
            5 => Ok(Granularity::FiveMin),
            10 => Ok(Granularity::TenMin),
            15 => Ok(Granularity::FifteenMin),
            30 => Ok(Granularity::ThirtyMin),
            60 => Ok(Granularity::SixtyMin),
            _ => Err(ConfigError::UnsupportedGranularity {
                minutes,
                allowed: SUPPORTED_MINUTES
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            }),
        }
    }

    /// Returns the duration of this granularity in minutes
    pub fn to_minutes(&self) -> u32 {
        match self {
            Granularity::OneMin => 1,
            Granularity::FiveMin => 5,
            Granularity::TenMin => 10,
            Granularity::FifteenMin => 15,
            Granularity::ThirtyMin => 30,
            Granularity::SixtyMin => 60,
        }
    }

    /// Interval parameter for the quote service chart endpoint
    pub fn to_yahoo_interval(&self) -> String {
        format!("{}m", self.to_minutes())
    }

    /// Lookback period requested from the quote service.
    ///
    /// One-minute bars are only served for the last week.
    pub fn to_yahoo_range(&self) -> &'static str {
        match self {
            Granularity::OneMin => "7d",
            _ => "30d",
        }
    }

    /// Converts to Binance API interval string
    pub fn to_binance_interval(&self) -> String {
        match self {
            // Binance rejects "60m"
            Granularity::SixtyMin => "1h".to_string(),
            other => format!("{}m", other.to_minutes()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.to_minutes())
    }
}
