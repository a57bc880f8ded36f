// Market data domain
pub mod bar;
pub mod granularity;

pub use bar::{Bar, PriceSeries};
pub use granularity::Granularity;
