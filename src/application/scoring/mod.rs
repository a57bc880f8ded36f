pub mod evaluation;
pub mod isolation_forest;
pub mod ranking;

pub use evaluation::{FuturePerformance, SANITY_THRESHOLD_PCT, evaluate, future_performance};
pub use isolation_forest::{IsolationForest, IsolationForestConfig, feature_matrix, score_vectors};
pub use ranking::{annotate, rank};
