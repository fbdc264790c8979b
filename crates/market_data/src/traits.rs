use async_trait::async_trait;
use common::error::ScanResult;
use common::models::{Candle, MarketListing, Symbol};

/// The exchange collaborator the scanner reads from.
///
/// Implementations own rate limiting and retries; a returned error is terminal
/// for that call.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Every listed pair with its market type, status and trailing volume.
    async fn fetch_listings(&self) -> ScanResult<Vec<MarketListing>>;

    /// Up to `limit` candles for `symbol`, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> ScanResult<Vec<Candle>>;
}

/// Conversion from a wire payload into a domain model.
pub trait RemoteResponse<T> {
    fn to_domain(&self) -> anyhow::Result<T>;
}
