use crate::domain::market::{Bar, Granularity};
use crate::domain::ports::MarketDataProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum ScriptedResponse {
    Bars(Vec<Bar>),
    Failure(String),
}

/// Market data provider serving scripted per-symbol responses.
///
/// Unknown symbols return an empty series, which the pipeline treats as
/// "not found".
#[derive(Clone, Default)]
pub struct MockMarketDataProvider {
    responses: HashMap<String, ScriptedResponse>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.responses
            .insert(symbol.to_string(), ScriptedResponse::Bars(bars));
        self
    }

    pub fn with_failure(mut self, symbol: &str, reason: &str) -> Self {
        self.responses.insert(
            symbol.to_string(),
            ScriptedResponse::Failure(reason.to_string()),
        );
        self
    }

    /// Delays every response, to exercise timeouts and deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_recent_bars(&self, symbol: &str, _granularity: Granularity) -> Result<Vec<Bar>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(symbol) {
            Some(ScriptedResponse::Bars(bars)) => Ok(bars.clone()),
            Some(ScriptedResponse::Failure(reason)) => {
                Err(anyhow!("Mock provider failure for {}: {}", symbol, reason))
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::bar::test_support::bar_at;

    #[tokio::test]
    async fn test_scripted_responses() {
        let provider = MockMarketDataProvider::new()
            .with_bars("AAA", vec![bar_at(0, 1.0, 1.0)])
            .with_failure("BBB", "boom");

        let granularity = Granularity::FiveMin;
        assert_eq!(provider.fetch_recent_bars("AAA", granularity).await.unwrap().len(), 1);
        assert!(provider.fetch_recent_bars("BBB", granularity).await.is_err());
        assert!(provider.fetch_recent_bars("ZZZ", granularity).await.unwrap().is_empty());
        assert_eq!(provider.calls(), 3);
    }
}
