pub mod engine;
pub mod indicators;
pub mod trend;

pub use engine::FeatureEngine;
pub use trend::{TrendSummary, trend_summary};
