pub mod export;
pub mod metrics;
pub mod ranking;
pub mod services;
pub mod universe;

pub use metrics::MetricEngine;
pub use ranking::{MetricField, RankedTable, TableFilter};
pub use services::scan_service::{ScanOutcome, Scanner, SkippedSymbol};
pub use universe::{UniverseBuilder, UniverseCache};
