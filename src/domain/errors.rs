use thiserror::Error;

/// Reasons a single symbol is excluded from a scan.
///
/// These are recoverable: the symbol is logged and skipped, and the run
/// continues with the rest of the universe.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolRejection {
    #[error("Provider error: {reason}")]
    Provider { reason: String },

    #[error("Provider returned no bars")]
    Empty,

    #[error("Malformed series: {reason}")]
    Malformed { reason: String },

    #[error("Bar count {bar_count} differs from modal bar count {modal_count}")]
    ShapeMismatch { bar_count: usize, modal_count: usize },

    #[error("Series too short: {available} bars, need more than {required}")]
    TooShort { available: usize, required: usize },

    #[error("Close volatility {volatility:.4} does not exceed threshold {threshold:.4}")]
    LowVolatility { volatility: f64, threshold: f64 },

    #[error("Average volume {average:.1} over last {window} bars below minimum {minimum:.1}")]
    LowVolume {
        average: f64,
        minimum: f64,
        window: usize,
    },

    #[error("Feature vector contains non-finite values")]
    NonFiniteFeatures,

    #[error("Feature vector length {length} differs from modal length {modal_length}")]
    FeatureLengthMismatch { length: usize, modal_length: usize },

    #[error("Retrieval timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors related to invalid run configuration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported granularity {minutes}m. Allowed values: {allowed}")]
    UnsupportedGranularity { minutes: u32, allowed: String },

    #[error("{provider} does not serve {minutes}m bars")]
    GranularityNotServed { minutes: u32, provider: String },

    #[error("Test mode needs at least 2 future bars, got {future_bars}")]
    HoldoutTooShort { future_bars: usize },

    #[error("Unsupported data source: {0}. Must be 'yahoo_finance' or 'binance'")]
    UnsupportedDataSource(String),

    #[error("Unsupported output format: {0}. Must be 'cli' or 'json'")]
    UnsupportedOutputFormat(String),

    #[error("Symbol list file not found: {path}")]
    MissingSymbolList { path: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Conditions that stop a scan before it produces output
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("No symbols survived acquisition and filtering; nothing to score")]
    EmptyFeatureMatrix,

    #[error("Feature matrix rows have inconsistent length: expected {expected}, row {row} has {actual}")]
    RaggedFeatureMatrix {
        expected: usize,
        row: usize,
        actual: usize,
    },

    #[error("Test mode requested top {requested} symbols but only {available} survived")]
    InsufficientRankedSymbols { requested: usize, available: usize },

    #[error(
        "No future data for {symbol}: {available} future bars, need {required}. Re-run acquisition with test mode enabled or disable test mode"
    )]
    InsufficientFutureData {
        symbol: String,
        available: usize,
        required: usize,
    },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}
