use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use common::config::ScannerConfig;
use common::error::{ScanError, ScanResult};
use common::models::{MarketListing, MarketType, Symbol};
use market_data::MarketDataSource;
use tracing::info;

/// Base assets never scanned.
pub const EXCLUDED_BASES: &[&str] = &[
    // Leveraged tokens
    "ETHUP", "ETHDOWN", "ETHBULL", "ETHBEAR", "BTCUP", "BTCDOWN", "BNBUP", "BNBDOWN", "BNBBULL",
    "BNBBEAR", "ADAUP", "ADADOWN", "LINKUP", "LINKDOWN", "XTZUP", "XTZDOWN", "EOSUP", "EOSDOWN",
    "EOSBULL", "EOSBEAR", "TRXUP", "TRXDOWN", "XRPUP", "XRPDOWN", "XRPBULL", "XRPBEAR", "DOTUP",
    "DOTDOWN", "LTCUP", "LTCDOWN", "UNIUP", "UNIDOWN", "SXPUP", "SXPDOWN", "FILUP", "FILDOWN",
    "YFIUP", "YFIDOWN", "BCHUP", "BCHDOWN", "AAVEUP", "AAVEDOWN", "SUSHIUP", "SUSHIDOWN", "XLMUP",
    "XLMDOWN", "1INCHUP", "1INCHDOWN", "BULL", "BEAR",
    // Stablecoins
    "USDC", "TUSD", "USDS", "BUSD", "DAI", "SUSD", "USDP", "FDUSD", "AEUR", "EURI", "XUSD", "USD1",
    "BFUSD", "USDE", "USTC", "USDSB",
    // Wrapped / bridged
    "WBTC", "WBETH", "BETH",
    // Fiat
    "EUR", "GBP", "AUD", "BKRW",
    // Dead or deprecated
    "FTT", "LUNC", "BCC", "VEN", "PAX", "BCHABC", "NANO", "GTO", "ERD", "COCOS", "DOCK", "HC",
    "MCO", "VITE", "DREP", "LTO", "STPT", "WTC", "XZC", "GXS", "AKRO",
];

/// Selects the liquid spot pairs of one quote asset.
#[derive(Debug, Clone)]
pub struct UniverseBuilder {
    quote: String,
    limit: usize,
    excluded: HashSet<String>,
}

impl UniverseBuilder {
    pub fn new(quote: &str, limit: usize) -> Self {
        Self {
            quote: quote.to_uppercase(),
            limit,
            excluded: EXCLUDED_BASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(&config.quote, config.universe_limit).with_excludes(&config.extra_excludes)
    }

    pub fn with_excludes(mut self, bases: &[String]) -> Self {
        self.excluded.extend(bases.iter().map(|b| b.to_uppercase()));
        self
    }

    pub fn is_excluded(&self, base: &str) -> bool {
        self.excluded.contains(&base.to_uppercase())
    }

    /// Filters, dedups, orders by volume (descending, stable) and truncates.
    pub fn build(&self, listings: &[MarketListing]) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&MarketListing> = listings
            .iter()
            .filter(|l| l.market_type == MarketType::Spot && l.trading)
            .filter(|l| l.symbol.quote() == self.quote)
            .filter(|l| !self.is_excluded(l.symbol.base()))
            .filter(|l| seen.insert(l.symbol.clone()))
            .collect();

        candidates.sort_by(|a, b| b.volume.total_cmp(&a.volume));

        candidates
            .into_iter()
            .take(self.limit)
            .map(|l| l.symbol.clone())
            .collect()
    }

    /// Reads the listing from `source` and builds the universe. Listing failures propagate.
    pub async fn load(&self, source: &dyn MarketDataSource) -> ScanResult<Vec<Symbol>> {
        let listings = source.fetch_listings().await?;
        let universe = self.build(&listings);

        info!(
            "Universe built with {} symbols from {} listings ({} excluded bases)",
            universe.len(),
            listings.len(),
            self.excluded.len()
        );
        Ok(universe)
    }
}

/// Last built universe and when it was built.
#[derive(Debug, Clone, Default)]
pub struct UniverseCache {
    entry: Option<(DateTime<Utc>, Vec<Symbol>)>,
    ttl: Option<TimeDelta>,
}

impl UniverseCache {
    /// Entries never expire on their own; only `invalidate` clears them.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            entry: None,
            ttl: Some(ttl),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        match config.universe_ttl_secs {
            Some(secs) => i64::try_from(secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .map(Self::with_ttl)
                .ok_or_else(|| {
                    ScanError::InvalidConfig(format!("universe TTL of {} seconds is out of range", secs))
                }),
            None => Ok(Self::new()),
        }
    }

    pub fn get(&self, now: DateTime<Utc>) -> Option<&[Symbol]> {
        let (built_at, symbols) = self.entry.as_ref()?;
        match self.ttl {
            Some(ttl) if now - *built_at >= ttl => None,
            _ => Some(symbols.as_slice()),
        }
    }

    pub fn store(&mut self, built_at: DateTime<Utc>, symbols: Vec<Symbol>) {
        self.entry = Some((built_at, symbols));
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|(ts, _)| *ts)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Returns the cached universe, rebuilding it through `builder` when empty or expired.
    pub async fn get_or_load(
        &mut self,
        builder: &UniverseBuilder,
        source: &dyn MarketDataSource,
    ) -> ScanResult<Vec<Symbol>> {
        let now = Utc::now();
        if let Some(symbols) = self.get(now) {
            return Ok(symbols.to_vec());
        }

        let symbols = builder.load(source).await?;
        self.store(now, symbols.clone());
        Ok(symbols)
    }

    /// Drops the cached entry and rebuilds it.
    pub async fn refresh(
        &mut self,
        builder: &UniverseBuilder,
        source: &dyn MarketDataSource,
    ) -> ScanResult<Vec<Symbol>> {
        self.invalidate();
        self.get_or_load(builder, source).await
    }
}
