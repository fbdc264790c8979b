use crate::models::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketType {
    Spot,
    Derivative,
}

/// A pair as reported by the exchange listing, joined with its trailing volume.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketListing {
    pub symbol: Symbol,
    pub market_type: MarketType,
    pub trading: bool,
    pub volume: f64,
}
