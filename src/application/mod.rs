// Per-symbol acquisition, filtering and feature cache writes
pub mod acquisition;

// Indicator computation and feature vectors
pub mod features;

// Isolation forest, ranking and backtest evaluation
pub mod scoring;

// Pipeline orchestrator
pub mod scanner;

// Console and JSON output
pub mod reporting;
