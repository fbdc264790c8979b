use std::collections::HashMap;

use anyhow::Context;
use common::models::{MarketListing, MarketType, Symbol};
use serde::Deserialize;

use crate::traits::RemoteResponse;

#[derive(Deserialize, Debug)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize, Debug)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(rename(deserialize = "baseAsset"))]
    pub base_asset: String,
    #[serde(rename(deserialize = "quoteAsset"))]
    pub quote_asset: String,
    #[serde(rename(deserialize = "isSpotTradingAllowed"), default)]
    pub is_spot_trading_allowed: bool,
}

/// Entry of `GET /api/v3/ticker/24hr` without a symbol filter.
#[derive(Deserialize, Debug)]
pub struct TickerResponse {
    pub symbol: String,
    #[serde(rename(deserialize = "quoteVolume"))]
    pub quote_volume: String,
}

impl RemoteResponse<f64> for TickerResponse {
    fn to_domain(&self) -> anyhow::Result<f64> {
        self.quote_volume
            .parse::<f64>()
            .with_context(|| format!("invalid quote volume '{}' for {}", self.quote_volume, self.symbol))
    }
}

impl ExchangeInfoResponse {
    /// Joins the listing with 24h quote volumes. Pairs without a ticker get zero volume.
    pub fn into_listings(self, volumes: &HashMap<String, f64>) -> Vec<MarketListing> {
        self.symbols
            .into_iter()
            .map(|info| MarketListing {
                volume: volumes.get(&info.symbol).copied().unwrap_or(0.0),
                symbol: Symbol::new(&info.base_asset, &info.quote_asset),
                market_type: if info.is_spot_trading_allowed {
                    MarketType::Spot
                } else {
                    MarketType::Derivative
                },
                trading: info.status == "TRADING",
            })
            .collect()
    }
}
