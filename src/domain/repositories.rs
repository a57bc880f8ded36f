//! Repository Pattern Abstractions
//!
//! The feature cache persists per-symbol acquisition results so a long scan
//! can be resumed or replayed without touching the market data provider.
//! It holds exactly one run: a saving acquisition clears it before writing.
//!
//! # Implementations
//!
//! - `SqliteFeatureCache`: SQLite-backed, survives restarts
//! - `InMemoryFeatureCache`: for tests

use crate::domain::features::IndicatorSet;
use crate::domain::market::PriceSeries;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cached acquisition result for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSymbol {
    pub symbol: String,
    pub indicators: IndicatorSet,
    pub historical: PriceSeries,
    pub future: PriceSeries,
    /// Raw bar count returned by the provider
    pub bar_count: usize,
}

/// Repository for per-symbol feature dictionaries and price data
#[async_trait]
pub trait FeatureCacheRepository: Send + Sync {
    /// Insert or replace a batch of symbols
    async fn save_batch(&self, entries: &[CachedSymbol]) -> Result<()>;

    /// Remove every cached symbol
    async fn clear(&self) -> Result<()>;

    /// Load every cached symbol, ordered by symbol
    async fn load_all(&self) -> Result<Vec<CachedSymbol>>;

    /// Count cached symbols
    async fn count(&self) -> Result<usize>;
}
