// Indicator schema and feature vectors
pub mod feature_vector;
pub mod indicator_key;

pub use feature_vector::{FeatureVector, IndicatorSet};
pub use indicator_key::{FEATURE_SCHEMA_VERSION, IndicatorFamily, IndicatorKey};
