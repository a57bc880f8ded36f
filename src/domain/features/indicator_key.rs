use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version of the indicator key schema.
///
/// Bump whenever a key is added, removed or its values change shape; cached
/// feature dictionaries with another version are ignored on load.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Indicator families computed per symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorFamily {
    AccumulationDistribution,
    CommodityChannelIndex,
    DailyLogReturn,
    EaseOfMovement,
    RelativeStrengthIndex,
    Stochastic,
    VolumeReturns,
}

impl IndicatorFamily {
    fn prefix(&self) -> &'static str {
        match self {
            IndicatorFamily::AccumulationDistribution => "acc_dist",
            IndicatorFamily::CommodityChannelIndex => "cci",
            IndicatorFamily::DailyLogReturn => "daily_log_return",
            IndicatorFamily::EaseOfMovement => "eom",
            IndicatorFamily::RelativeStrengthIndex => "rsi",
            IndicatorFamily::Stochastic => "stochs",
            IndicatorFamily::VolumeReturns => "volume_returns",
        }
    }

    /// Whether values of this family go into the scored feature vector.
    ///
    /// Oscillators, CCI and accumulation/distribution are kept in the
    /// dictionary for inspection only.
    pub fn contributes_to_vector(&self) -> bool {
        matches!(
            self,
            IndicatorFamily::VolumeReturns
                | IndicatorFamily::DailyLogReturn
                | IndicatorFamily::EaseOfMovement
        )
    }

    /// Whether the raw last-H values are stored ahead of the trend triple
    pub fn stores_raw_window(&self) -> bool {
        !matches!(
            self,
            IndicatorFamily::AccumulationDistribution | IndicatorFamily::EaseOfMovement
        )
    }

    /// Whether the trend triple (slope, |r|, p-value) is stored
    pub fn stores_trend(&self) -> bool {
        !matches!(self, IndicatorFamily::DailyLogReturn)
    }
}

/// A named, parameterised indicator, e.g. `rsi-10`.
///
/// Keys order by their rendered name, so iterating a sorted collection of
/// keys yields the lexicographic layout of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IndicatorKey {
    pub family: IndicatorFamily,
    pub lookback: Option<usize>,
}

impl IndicatorKey {
    pub fn new(family: IndicatorFamily, lookback: usize) -> Self {
        Self {
            family,
            lookback: Some(lookback),
        }
    }

    pub fn unparameterised(family: IndicatorFamily) -> Self {
        Self {
            family,
            lookback: None,
        }
    }

    pub fn name(&self) -> String {
        match self.lookback {
            Some(n) => format!("{}-{}", self.family.prefix(), n),
            None => self.family.prefix().to_string(),
        }
    }

    /// The full, fixed set of keys for the current schema version
    pub fn schema() -> Vec<IndicatorKey> {
        use IndicatorFamily::*;

        let mut keys = Vec::new();
        for n in [5, 10, 15] {
            keys.push(IndicatorKey::new(RelativeStrengthIndex, n));
            keys.push(IndicatorKey::new(Stochastic, n));
        }
        keys.push(IndicatorKey::unparameterised(AccumulationDistribution));
        for n in [5, 10, 20] {
            keys.push(IndicatorKey::new(EaseOfMovement, n));
            keys.push(IndicatorKey::new(CommodityChannelIndex, n));
        }
        keys.push(IndicatorKey::unparameterised(DailyLogReturn));
        keys.push(IndicatorKey::unparameterised(VolumeReturns));
        keys.sort();
        keys
    }
}

impl Ord for IndicatorKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(&other.name())
    }
}

impl PartialOrd for IndicatorKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for IndicatorKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        IndicatorKey::schema()
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| anyhow!("Unknown indicator key: '{}'", s))
    }
}

impl From<IndicatorKey> for String {
    fn from(key: IndicatorKey) -> Self {
        key.name()
    }
}

impl TryFrom<String> for IndicatorKey {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_lexicographically_sorted() {
        let names: Vec<String> = IndicatorKey::schema().iter().map(|k| k.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "acc_dist");
        // "cci-10" sorts before "cci-5" by name
        assert_eq!(names[1], "cci-10");
        assert_eq!(names[3], "cci-5");
        assert_eq!(names[14], "volume_returns");
    }

    #[test]
    fn test_parse_round_trip() {
        for key in IndicatorKey::schema() {
            let parsed: IndicatorKey = key.name().parse().unwrap();
            assert_eq!(parsed, key);
        }
        assert!("macd-12".parse::<IndicatorKey>().is_err());
    }

    #[test]
    fn test_vector_contributors() {
        let contributing: Vec<String> = IndicatorKey::schema()
            .into_iter()
            .filter(|k| k.family.contributes_to_vector())
            .map(|k| k.name())
            .collect();
        assert_eq!(
            contributing,
            vec![
                "daily_log_return",
                "eom-10",
                "eom-20",
                "eom-5",
                "volume_returns"
            ]
        );
    }
}
