use crate::domain::market::{Bar, Granularity};
use anyhow::Result;
use async_trait::async_trait;

/// Source of recent bars for a symbol.
///
/// An empty vector means the provider knows nothing about the symbol.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_recent_bars(&self, symbol: &str, granularity: Granularity) -> Result<Vec<Bar>>;
}
