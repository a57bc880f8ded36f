pub mod binance;
pub mod core;
pub mod factory;
pub mod mock;
pub mod persistence;
pub mod repositories;
pub mod symbols;
pub mod yahoo;

pub use factory::ServiceFactory;
pub use repositories::InMemoryFeatureCache;
