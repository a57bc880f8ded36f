//! Mutable state shared by every symbol of one acquisition run.
//!
//! Fetches run concurrently but their results are folded into the context
//! one at a time, in symbol order, so the context needs no locking.

use crate::domain::errors::SymbolRejection;
use crate::domain::repositories::{CachedSymbol, FeatureCacheRepository};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Observations needed before divergent bar counts are rejected
pub const MIN_MODE_OBSERVATIONS: usize = 6;

/// Most frequent value; ties go to the value seen first.
pub fn modal_value<I>(values: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Running mode of the raw bar counts returned by the provider
#[derive(Debug, Default)]
pub struct BarCountTracker {
    observed: Vec<usize>,
}

impl BarCountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `bar_count` and checks it against the mode so far.
    ///
    /// The check only applies once [`MIN_MODE_OBSERVATIONS`] counts,
    /// including this one, have been seen.
    pub fn observe(&mut self, bar_count: usize) -> Result<(), SymbolRejection> {
        self.observed.push(bar_count);
        if !self.is_established() {
            return Ok(());
        }

        match self.mode() {
            Some(modal_count) if modal_count != bar_count => Err(SymbolRejection::ShapeMismatch {
                bar_count,
                modal_count,
            }),
            _ => Ok(()),
        }
    }

    pub fn is_established(&self) -> bool {
        self.observed.len() >= MIN_MODE_OBSERVATIONS
    }

    pub fn mode(&self) -> Option<usize> {
        modal_value(self.observed.iter().copied())
    }
}

/// Acquisition run state: the bar-count tracker and the buffered cache writer
pub struct AcquisitionContext {
    tracker: BarCountTracker,
    cache: Option<Arc<dyn FeatureCacheRepository>>,
    pending: Vec<CachedSymbol>,
    flush_every: usize,
    written: usize,
}

impl AcquisitionContext {
    pub fn new(cache: Option<Arc<dyn FeatureCacheRepository>>, flush_every: usize) -> Self {
        Self {
            tracker: BarCountTracker::new(),
            cache,
            pending: Vec::new(),
            flush_every: flush_every.max(1),
            written: 0,
        }
    }

    pub fn tracker(&self) -> &BarCountTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut BarCountTracker {
        &mut self.tracker
    }

    /// Empties the cache so it only ever holds the symbols of this run.
    pub async fn start(&mut self) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        cache
            .clear()
            .await
            .context("Failed to clear feature cache before writing")?;
        debug!("Feature cache: cleared for a new run");
        Ok(())
    }

    /// Buffers an accepted symbol for the cache, writing every `flush_every`.
    pub async fn record(&mut self, entry: CachedSymbol) -> Result<()> {
        if self.cache.is_none() {
            return Ok(());
        }
        self.pending.push(entry);
        if self.pending.len() >= self.flush_every {
            self.flush().await?;
        }
        Ok(())
    }

    /// Writes everything buffered so far.
    pub async fn flush(&mut self) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(&mut self.pending);
        cache
            .save_batch(&batch)
            .await
            .context(format!("Failed to write {} symbols to feature cache", batch.len()))?;
        self.written += batch.len();
        debug!("Feature cache: flushed {} symbols ({} total)", batch.len(), self.written);
        Ok(())
    }

    /// Final flush at the end of acquisition.
    pub async fn finish(&mut self) -> Result<()> {
        self.flush().await?;
        if self.cache.is_some() {
            info!("Feature cache: {} symbols written", self.written);
        }
        Ok(())
    }
}
