use crate::domain::repositories::{CachedSymbol, FeatureCacheRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// SQLite-backed feature cache. Each symbol is one row; the indicator
/// dictionary and both price windows are stored as JSON.
pub struct SqliteFeatureCache {
    pool: SqlitePool,
}

impl SqliteFeatureCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeatureCacheRepository for SqliteFeatureCache {
    async fn save_batch(&self, entries: &[CachedSymbol]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        let now = chrono::Utc::now().timestamp();

        for entry in entries {
            let indicators = serde_json::to_string(&entry.indicators)
                .context(format!("Failed to serialize indicators for {}", entry.symbol))?;
            let historical = serde_json::to_string(&entry.historical)?;
            let future = serde_json::to_string(&entry.future)?;

            sqlx::query(
                r#"
                INSERT INTO feature_cache (symbol, schema_version, indicators_json, historical_json, future_json, bar_count, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(symbol) DO UPDATE SET
                    schema_version = excluded.schema_version,
                    indicators_json = excluded.indicators_json,
                    historical_json = excluded.historical_json,
                    future_json = excluded.future_json,
                    bar_count = excluded.bar_count,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&entry.symbol)
            .bind(entry.indicators.schema_version as i64)
            .bind(indicators)
            .bind(historical)
            .bind(future)
            .bind(entry.bar_count as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context(format!("Failed to cache {}", entry.symbol))?;
        }

        tx.commit().await.context("Failed to commit feature cache batch")?;
        debug!("Feature cache: wrote {} symbols", entries.len());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM feature_cache")
            .execute(&self.pool)
            .await
            .context("Failed to clear feature cache")?;
        debug!("Feature cache: cleared {} symbols", result.rows_affected());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<CachedSymbol>> {
        let rows = sqlx::query(
            "SELECT symbol, indicators_json, historical_json, future_json, bar_count FROM feature_cache ORDER BY symbol",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read feature cache")?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let symbol: String = row.try_get("symbol")?;
            let indicators: String = row.try_get("indicators_json")?;
            let historical: String = row.try_get("historical_json")?;
            let future: String = row.try_get("future_json")?;
            let bar_count: i64 = row.try_get("bar_count")?;

            entries.push(CachedSymbol {
                indicators: serde_json::from_str(&indicators)
                    .context(format!("Corrupt cached indicators for {}", symbol))?,
                historical: serde_json::from_str(&historical)
                    .context(format!("Corrupt cached history for {}", symbol))?,
                future: serde_json::from_str(&future)
                    .context(format!("Corrupt cached holdout for {}", symbol))?,
                bar_count: usize::try_from(bar_count).unwrap_or_default(),
                symbol,
            });
        }
        Ok(entries)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feature_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{IndicatorKey, IndicatorSet};
    use crate::domain::market::bar::test_support::series_from_closes;
    use crate::infrastructure::persistence::Database;

    async fn cache_in(dir: &tempfile::TempDir) -> SqliteFeatureCache {
        let url = format!("sqlite://{}", dir.path().join("cache").join("features.db").display());
        let db = Database::new(&url).await.unwrap();
        SqliteFeatureCache::new(db.pool)
    }

    fn entry(symbol: &str, bar_count: usize) -> CachedSymbol {
        let mut indicators = IndicatorSet::new();
        let key = IndicatorKey::schema()[0];
        indicators.insert(key, vec![1.5, f64::NAN, 2.5]);
        CachedSymbol {
            symbol: symbol.to_string(),
            indicators,
            historical: series_from_closes(&[10.0, 10.5, 10.25], 1_000.0),
            future: series_from_closes(&[10.25, 10.75], 900.0),
            bar_count,
        }
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = cache_in(&dir).await;
            cache
                .save_batch(&[entry("MSFT", 500), entry("AAPL", 500)])
                .await
                .unwrap();
        }

        let cache = cache_in(&dir).await;
        let loaded = cache.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].symbol, "AAPL");
        assert_eq!(loaded[0].bar_count, 500);
        assert_eq!(loaded[0].historical, entry("AAPL", 500).historical);
        assert_eq!(loaded[1].future.len(), 2);

        let values = loaded[0].indicators.get(&IndicatorKey::schema()[0]).unwrap();
        assert_eq!(values[0], 1.5);
        assert!(values[1].is_nan());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir).await;

        cache.save_batch(&[entry("AAPL", 500)]).await.unwrap();
        cache.save_batch(&[entry("AAPL", 480)]).await.unwrap();
        cache.save_batch(&[]).await.unwrap();

        assert_eq!(cache.count().await.unwrap(), 1);
        assert_eq!(cache.load_all().await.unwrap()[0].bar_count, 480);
    }

    #[tokio::test]
    async fn test_clear_removes_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir).await;

        cache
            .save_batch(&[entry("AAPL", 500), entry("MSFT", 500)])
            .await
            .unwrap();
        cache.clear().await.unwrap();
        cache.save_batch(&[entry("TSLA", 500)]).await.unwrap();

        let loaded = cache.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].symbol, "TSLA");
    }
}
