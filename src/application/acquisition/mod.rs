pub mod context;
pub mod engine;
pub mod filters;

pub use context::{AcquisitionContext, BarCountTracker};
pub use engine::{
    AcquiredSymbol, AcquisitionEngine, AcquisitionEngineBuilder, AcquisitionOutcome,
    AcquisitionSettings,
};
