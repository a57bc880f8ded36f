// Market data domain (bars, series, granularity)
pub mod market;

// Technical feature schema
pub mod features;

// Scan results and backtest records
pub mod scan;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
