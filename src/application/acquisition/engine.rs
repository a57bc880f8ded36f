//! Per-symbol acquisition: fetch, validate, split, filter and featurise.
//!
//! Network requests run through a bounded, order-preserving stream. Every
//! result is then processed sequentially so the bar-count mode and cache
//! writes see symbols in list order. Nothing that fails for one symbol
//! escapes that symbol's processing.

use super::context::{AcquisitionContext, MIN_MODE_OBSERVATIONS, modal_value};
use super::filters::{check_volatility, check_volume};
use crate::application::features::FeatureEngine;
use crate::config::ScanConfig;
use crate::domain::errors::SymbolRejection;
use crate::domain::features::{FeatureVector, IndicatorSet};
use crate::domain::market::{Bar, Granularity, PriceSeries};
use crate::domain::ports::MarketDataProvider;
use crate::domain::repositories::{CachedSymbol, FeatureCacheRepository};
use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

/// A symbol that passed every acquisition filter
#[derive(Debug, Clone)]
pub struct AcquiredSymbol {
    pub symbol: String,
    pub features: FeatureVector,
    pub indicators: IndicatorSet,
    pub historical: PriceSeries,
    pub future: PriceSeries,
    /// Raw bar count returned by the provider
    pub bar_count: usize,
}

impl AcquiredSymbol {
    fn to_cached(&self) -> CachedSymbol {
        CachedSymbol {
            symbol: self.symbol.clone(),
            indicators: self.indicators.clone(),
            historical: self.historical.clone(),
            future: self.future.clone(),
            bar_count: self.bar_count,
        }
    }

    fn from_cached(entry: CachedSymbol) -> Self {
        Self {
            symbol: entry.symbol,
            features: entry.indicators.feature_vector(),
            indicators: entry.indicators,
            historical: entry.historical,
            future: entry.future,
            bar_count: entry.bar_count,
        }
    }
}

/// Surviving symbols, positionally aligned, plus what was dropped and why
#[derive(Debug, Default)]
pub struct AcquisitionOutcome {
    pub symbols: Vec<AcquiredSymbol>,
    pub rejected: Vec<(String, SymbolRejection)>,
    /// Acquisition stopped at the run deadline before every symbol was fetched
    pub deadline_reached: bool,
}

impl AcquisitionOutcome {
    pub fn features(&self) -> Vec<FeatureVector> {
        self.symbols.iter().map(|s| s.features.clone()).collect()
    }

    fn reject(&mut self, symbol: &str, rejection: SymbolRejection) {
        debug!("Dropping {}: {}", symbol, rejection);
        self.rejected.push((symbol.to_string(), rejection));
    }
}

/// Acquisition filter and concurrency settings
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub granularity: Granularity,
    /// Bars withheld as the future series; `None` outside test mode
    pub holdout: Option<usize>,
    pub volatility_threshold: f64,
    pub min_volume: f64,
    pub concurrency: usize,
    pub symbol_timeout: Duration,
    pub run_deadline: Option<Duration>,
    pub cache_flush_every: usize,
}

impl AcquisitionSettings {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            granularity: config.granularity,
            holdout: config.is_test.then_some(config.future_bars),
            volatility_threshold: config.volatility_threshold,
            min_volume: config.min_volume,
            concurrency: config.acquisition_concurrency.max(1),
            symbol_timeout: Duration::from_secs(config.symbol_timeout_secs),
            run_deadline: config.run_deadline_secs.map(Duration::from_secs),
            cache_flush_every: config.cache.flush_every,
        }
    }
}

pub struct AcquisitionEngine {
    provider: Option<Arc<dyn MarketDataProvider>>,
    cache: Option<Arc<dyn FeatureCacheRepository>>,
    save_to_cache: bool,
    features: FeatureEngine,
    settings: AcquisitionSettings,
}

impl AcquisitionEngine {
    pub fn builder() -> AcquisitionEngineBuilder {
        AcquisitionEngineBuilder::default()
    }

    /// Fetches and processes every symbol from the market data provider.
    pub async fn acquire(&self, symbols: &[String]) -> Result<AcquisitionOutcome> {
        let provider = self
            .provider
            .clone()
            .ok_or_else(|| anyhow!("Acquisition requires a market data provider"))?;
        let writer = if self.save_to_cache {
            self.cache.clone()
        } else {
            None
        };

        info!(
            "Acquiring {} symbols from {} at {} ({} concurrent requests)",
            symbols.len(),
            provider.name(),
            self.settings.granularity,
            self.settings.concurrency
        );

        let mut context = AcquisitionContext::new(writer, self.settings.cache_flush_every);
        context.start().await?;
        let mut outcome = AcquisitionOutcome::default();

        let granularity = self.settings.granularity;
        let symbol_timeout = self.settings.symbol_timeout;
        let fetches = stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let provider = Arc::clone(&provider);
                async move {
                    let result = fetch_with_timeout(provider.as_ref(), &symbol, granularity, symbol_timeout).await;
                    (symbol, result)
                }
            })
            .buffered(self.settings.concurrency);
        let mut fetches = std::pin::pin!(fetches);

        let deadline = self.settings.run_deadline.map(|d| Instant::now() + d);
        let mut processed = 0usize;

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fetches.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            "Run deadline reached after {}/{} symbols; scoring what was collected",
                            processed,
                            symbols.len()
                        );
                        outcome.deadline_reached = true;
                        break;
                    }
                },
                None => fetches.next().await,
            };
            let Some((symbol, fetched)) = next else {
                break;
            };
            processed += 1;

            let processed_symbol = fetched
                .and_then(|bars| self.process(&symbol, bars, &mut context));
            match processed_symbol {
                Ok(acquired) => {
                    if let Err(e) = context.record(acquired.to_cached()).await {
                        warn!("{:#}", e);
                    }
                    outcome.symbols.push(acquired);
                }
                Err(rejection) => outcome.reject(&symbol, rejection),
            }

            if processed % 100 == 0 {
                info!(
                    "Acquisition progress: {}/{} symbols, {} accepted",
                    processed,
                    symbols.len(),
                    outcome.symbols.len()
                );
            }
        }

        if let Err(e) = context.finish().await {
            warn!("{:#}", e);
        }

        if context.tracker().is_established() {
            if let Some(mode) = context.tracker().mode() {
                reconcile_bar_counts(&mut outcome, mode);
            }
        }
        retain_modal_length(&mut outcome);

        info!(
            "Acquisition finished: {} symbols accepted, {} rejected",
            outcome.symbols.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    /// Rebuilds the acquisition outcome from the feature cache without
    /// touching the provider.
    pub async fn load_from_cache(&self) -> Result<AcquisitionOutcome> {
        let cache = self
            .cache
            .clone()
            .ok_or_else(|| anyhow!("Loading from cache requires a feature cache"))?;
        let entries = cache
            .load_all()
            .await
            .context("Failed to load feature cache")?;
        info!("Loaded {} symbols from feature cache", entries.len());

        let mut outcome = AcquisitionOutcome::default();
        let mut bar_counts = Vec::with_capacity(entries.len());

        for entry in entries {
            if !entry.indicators.is_current_schema() {
                debug!(
                    "Skipping cached {}: schema version {}",
                    entry.symbol, entry.indicators.schema_version
                );
                continue;
            }
            let acquired = AcquiredSymbol::from_cached(entry);
            if !acquired.features.is_finite() {
                outcome.reject(&acquired.symbol, SymbolRejection::NonFiniteFeatures);
                continue;
            }
            bar_counts.push(acquired.bar_count);
            outcome.symbols.push(acquired);
        }

        if bar_counts.len() >= MIN_MODE_OBSERVATIONS {
            if let Some(mode) = modal_value(bar_counts) {
                reconcile_bar_counts(&mut outcome, mode);
            }
        }
        retain_modal_length(&mut outcome);

        info!(
            "Cache replay finished: {} symbols accepted, {} rejected",
            outcome.symbols.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    fn process(
        &self,
        symbol: &str,
        bars: Vec<Bar>,
        context: &mut AcquisitionContext,
    ) -> Result<AcquiredSymbol, SymbolRejection> {
        if bars.is_empty() {
            return Err(SymbolRejection::Empty);
        }
        let bar_count = bars.len();
        context.tracker_mut().observe(bar_count)?;

        let series = PriceSeries::new(bars)?.without_first_bar();
        let (historical, future) = match self.settings.holdout {
            Some(future_bars) => series.split_holdout(future_bars)?,
            None => (series, PriceSeries::empty()),
        };

        check_volatility(&historical, self.settings.volatility_threshold)?;
        check_volume(&historical, self.settings.min_volume)?;

        let (indicators, features) =
            self.features
                .extract(&historical)
                .map_err(|e| SymbolRejection::Malformed {
                    reason: format!("feature extraction failed: {:#}", e),
                })?;
        if !features.is_finite() {
            return Err(SymbolRejection::NonFiniteFeatures);
        }

        Ok(AcquiredSymbol {
            symbol: symbol.to_string(),
            features,
            indicators,
            historical,
            future,
            bar_count,
        })
    }
}

async fn fetch_with_timeout(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    granularity: Granularity,
    limit: Duration,
) -> Result<Vec<Bar>, SymbolRejection> {
    match timeout(limit, provider.fetch_recent_bars(symbol, granularity)).await {
        Ok(Ok(bars)) => Ok(bars),
        Ok(Err(e)) => Err(SymbolRejection::Provider {
            reason: format!("{:#}", e),
        }),
        Err(_) => Err(SymbolRejection::Timeout {
            timeout_secs: limit.as_secs(),
        }),
    }
}

/// Drops symbols accepted before the bar-count mode settled that do not
/// match the final mode.
fn reconcile_bar_counts(outcome: &mut AcquisitionOutcome, mode: usize) {
    let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut outcome.symbols)
        .into_iter()
        .partition(|s| s.bar_count == mode);
    outcome.symbols = kept;
    for symbol in dropped {
        outcome.reject(
            &symbol.symbol,
            SymbolRejection::ShapeMismatch {
                bar_count: symbol.bar_count,
                modal_count: mode,
            },
        );
    }
}

/// Keeps only feature vectors of the modal length, together with their
/// price data.
pub fn retain_modal_length(outcome: &mut AcquisitionOutcome) {
    let Some(modal_length) = modal_value(outcome.symbols.iter().map(|s| s.features.len())) else {
        return;
    };
    let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut outcome.symbols)
        .into_iter()
        .partition(|s| s.features.len() == modal_length);
    outcome.symbols = kept;
    for symbol in dropped {
        outcome.reject(
            &symbol.symbol,
            SymbolRejection::FeatureLengthMismatch {
                length: symbol.features.len(),
                modal_length,
            },
        );
    }
}

#[derive(Default)]
pub struct AcquisitionEngineBuilder {
    provider: Option<Arc<dyn MarketDataProvider>>,
    cache: Option<Arc<dyn FeatureCacheRepository>>,
    save_to_cache: bool,
    history_to_use: Option<usize>,
    settings: Option<AcquisitionSettings>,
}

impl AcquisitionEngineBuilder {
    pub fn provider(mut self, provider: Arc<dyn MarketDataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Feature cache used for replay and, when `save` is set, for writing
    pub fn cache(mut self, cache: Arc<dyn FeatureCacheRepository>, save: bool) -> Self {
        self.cache = Some(cache);
        self.save_to_cache = save;
        self
    }

    pub fn history_to_use(mut self, history_to_use: usize) -> Self {
        self.history_to_use = Some(history_to_use);
        self
    }

    pub fn settings(mut self, settings: AcquisitionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> Result<AcquisitionEngine> {
        let history_to_use = self.history_to_use.context("history_to_use is required")?;
        let settings = self.settings.context("settings are required")?;

        Ok(AcquisitionEngine {
            provider: self.provider,
            cache: self.cache,
            save_to_cache: self.save_to_cache,
            features: FeatureEngine::new(history_to_use),
            settings,
        })
    }
}
