use super::indicator_key::{FEATURE_SCHEMA_VERSION, IndicatorKey};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Indicator values for one symbol, keyed and ordered by indicator name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub schema_version: u32,
    values: BTreeMap<IndicatorKey, IndicatorValues>,
}

/// Values of one indicator. Non-finite values serialize as `null` and are
/// restored as NaN so cached dictionaries keep their shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
struct IndicatorValues(Vec<f64>);

impl<'de> Deserialize<'de> for IndicatorValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(IndicatorValues(
            raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
        ))
    }
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self {
            schema_version: FEATURE_SCHEMA_VERSION,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: IndicatorKey, values: Vec<f64>) {
        self.values.insert(key, IndicatorValues(values));
    }

    pub fn get(&self, key: &IndicatorKey) -> Option<&[f64]> {
        self.values.get(key).map(|v| v.0.as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_current_schema(&self) -> bool {
        self.schema_version == FEATURE_SCHEMA_VERSION
    }

    /// Concatenates the contributing indicators in key order.
    pub fn feature_vector(&self) -> FeatureVector {
        let values = self
            .values
            .iter()
            .filter(|(key, _)| key.family.contributes_to_vector())
            .flat_map(|(_, v)| v.0.iter().copied())
            .collect();
        FeatureVector(values)
    }
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat numeric representation of one symbol, the row fed to scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::IndicatorFamily;

    fn key(family: IndicatorFamily, n: usize) -> IndicatorKey {
        IndicatorKey::new(family, n)
    }

    #[test]
    fn test_feature_vector_uses_sorted_contributing_keys() {
        let mut set = IndicatorSet::new();
        set.insert(
            IndicatorKey::unparameterised(IndicatorFamily::VolumeReturns),
            vec![9.0],
        );
        set.insert(key(IndicatorFamily::EaseOfMovement, 5), vec![5.0]);
        set.insert(key(IndicatorFamily::EaseOfMovement, 10), vec![10.0]);
        set.insert(key(IndicatorFamily::RelativeStrengthIndex, 5), vec![99.0]);
        set.insert(
            IndicatorKey::unparameterised(IndicatorFamily::DailyLogReturn),
            vec![1.0, 2.0],
        );

        let vector = set.feature_vector();
        // daily_log_return, eom-10, eom-5, volume_returns; rsi excluded
        assert_eq!(vector.values(), &[1.0, 2.0, 10.0, 5.0, 9.0]);
    }

    #[test]
    fn test_non_finite_values_survive_json() {
        let mut set = IndicatorSet::new();
        set.insert(key(IndicatorFamily::CommodityChannelIndex, 5), vec![1.0, f64::NAN]);

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("cci-5"));
        let restored: IndicatorSet = serde_json::from_str(&json).unwrap();
        let values = restored.get(&key(IndicatorFamily::CommodityChannelIndex, 5)).unwrap();
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan());
    }

    #[test]
    fn test_is_finite() {
        assert!(FeatureVector(vec![1.0, 2.0]).is_finite());
        assert!(!FeatureVector(vec![1.0, f64::NAN]).is_finite());
        assert!(!FeatureVector(vec![f64::INFINITY]).is_finite());
    }
}
