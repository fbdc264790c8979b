pub mod candle;
pub mod listing;
pub mod metric;
pub mod symbol;

pub use candle::Candle;
pub use listing::{MarketListing, MarketType};
pub use metric::MetricRecord;
pub use symbol::Symbol;
