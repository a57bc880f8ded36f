pub mod database;
pub mod feature_cache_repository;

pub use database::Database;
pub use feature_cache_repository::SqliteFeatureCache;
