//! In-memory feature cache.
//!
//! Thread-safe through `Arc<RwLock>`. Contents are lost when the process
//! exits, which makes it the cache of choice for tests.

use crate::domain::repositories::{CachedSymbol, FeatureCacheRepository};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of FeatureCacheRepository
pub struct InMemoryFeatureCache {
    entries: Arc<RwLock<BTreeMap<String, CachedSymbol>>>,
}

impl InMemoryFeatureCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryFeatureCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureCacheRepository for InMemoryFeatureCache {
    async fn save_batch(&self, entries: &[CachedSymbol]) -> Result<()> {
        let mut stored = self.entries.write().await;
        for entry in entries {
            stored.insert(entry.symbol.clone(), entry.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<CachedSymbol>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
