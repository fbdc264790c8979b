use serde::Serialize;

use crate::models::Symbol;

/// Per-symbol metrics for one scan cycle. Values are already rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub symbol: Symbol,
    pub last_price: f64,
    #[serde(rename = "pct_change_%")]
    pub pct_change: f64,
    #[serde(rename = "breakout_%")]
    pub breakout: f64,
    pub vol_z: f64,
    pub vol_breakout: f64,
    pub relative_strength: f64,
    pub score: f64,
}
