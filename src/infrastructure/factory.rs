use crate::application::acquisition::{AcquisitionEngine, AcquisitionSettings};
use crate::application::scanner::Scanner;
use crate::config::{DataSource, ScanConfig};
use crate::domain::ports::MarketDataProvider;
use crate::domain::repositories::FeatureCacheRepository;
use crate::infrastructure::binance::BinanceMarketDataProvider;
use crate::infrastructure::core::HttpClientSettings;
use crate::infrastructure::persistence::{Database, SqliteFeatureCache};
use crate::infrastructure::yahoo::YahooMarketDataProvider;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    pub fn create_provider(config: &ScanConfig) -> Result<Arc<dyn MarketDataProvider>> {
        let http = HttpClientSettings {
            timeout: Duration::from_secs(config.providers.http_timeout_secs),
            max_retries: config.providers.http_max_retries,
        };

        let provider: Arc<dyn MarketDataProvider> = match config.data_source {
            DataSource::YahooFinance => Arc::new(
                YahooMarketDataProvider::builder()
                    .base_url(config.providers.yahoo.base_url.clone())
                    .http(http)
                    .build()?,
            ),
            DataSource::Binance => Arc::new(
                BinanceMarketDataProvider::builder()
                    .base_url(config.providers.binance.base_url.clone())
                    .http(http)
                    .build()?,
            ),
        };
        Ok(provider)
    }

    /// Opens the SQLite feature cache when the run reads from or writes to it.
    pub async fn create_cache(
        config: &ScanConfig,
    ) -> Result<Option<Arc<dyn FeatureCacheRepository>>> {
        if !config.cache.load && !config.cache.save {
            return Ok(None);
        }
        let db = Database::new(&config.cache.db_url).await?;
        Ok(Some(Arc::new(SqliteFeatureCache::new(db.pool))))
    }

    pub async fn build_scanner(config: ScanConfig) -> Result<Scanner> {
        let mut builder = AcquisitionEngine::builder()
            .history_to_use(config.history_to_use)
            .settings(AcquisitionSettings::from_config(&config));

        if !config.cache.load {
            let provider = Self::create_provider(&config)?;
            info!("Market data provider: {}", provider.name());
            builder = builder.provider(provider);
        }
        if let Some(cache) = Self::create_cache(&config).await? {
            builder = builder.cache(cache, config.cache.save && !config.cache.load);
        }

        Ok(Scanner::new(config, builder.build()?))
    }
}
