use anyhow::Context;
use chrono::DateTime;
use common::models::Candle;
use serde::Deserialize;

use crate::traits::RemoteResponse;

/// One row of `GET /api/v3/klines`.
///
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
/// trades, taker_buy_base, taker_buy_quote, ignore]`
#[derive(Deserialize, Debug)]
pub struct KlineRow(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub u64,
    pub String,
    pub String,
    pub String,
);

impl RemoteResponse<Candle> for KlineRow {
    fn to_domain(&self) -> anyhow::Result<Candle> {
        let open_time = DateTime::from_timestamp_millis(self.0)
            .with_context(|| format!("open time {} out of range", self.0))?;

        Ok(Candle {
            open_time,
            open: parse_price(&self.1, "open")?,
            high: parse_price(&self.2, "high")?,
            low: parse_price(&self.3, "low")?,
            close: parse_price(&self.4, "close")?,
            volume: parse_price(&self.5, "volume")?,
        })
    }
}

fn parse_price(raw: &str, field: &str) -> anyhow::Result<f64> {
    raw.parse::<f64>()
        .with_context(|| format!("invalid {} value '{}'", field, raw))
}
