//! Feature cache configuration parsing from environment variables.

use super::{parse_env, parse_flag};
use anyhow::Result;
use std::env;

/// Feature cache environment configuration
#[derive(Debug, Clone)]
pub struct CacheEnvConfig {
    /// Replay cached symbols instead of querying the provider
    pub load: bool,
    /// Persist accepted symbols during acquisition
    pub save: bool,
    pub db_url: String,
    /// Accepted symbols buffered between cache writes
    pub flush_every: usize,
}

impl Default for CacheEnvConfig {
    fn default() -> Self {
        Self {
            load: false,
            save: true,
            db_url: "sqlite://dictionaries/feature_cache.db".to_string(),
            flush_every: 100,
        }
    }
}

impl CacheEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            load: parse_flag("IS_LOAD_FROM_CACHE", defaults.load)?,
            save: parse_flag("IS_SAVE_CACHE", defaults.save)?,
            db_url: env::var("CACHE_DB_URL").unwrap_or(defaults.db_url),
            flush_every: parse_env("CACHE_FLUSH_EVERY", defaults.flush_every)?,
        })
    }
}
