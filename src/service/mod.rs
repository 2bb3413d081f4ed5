pub mod market;
pub mod resolution;

pub use market::{MarketService, DEFAULT_CACHE_DURATION};
pub use resolution::{AutoResolutionService, CheckReport};
