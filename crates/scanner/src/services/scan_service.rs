use chrono::{DateTime, Utc};
use common::config::ScannerConfig;
use common::error::{ScanError, ScanResult};
use common::models::{MetricRecord, Symbol};
use futures_util::{StreamExt, stream};
use market_data::MarketDataSource;
use tracing::{debug, info, warn};

use crate::metrics::MetricEngine;
use crate::ranking::RankedTable;
use crate::universe::{UniverseBuilder, UniverseCache};

/// A universe member that produced no metrics this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub reason: ScanError,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub table: RankedTable,
    pub skipped: Vec<SkippedSymbol>,
    pub universe_size: usize,
    pub scanned_at: DateTime<Utc>,
}

/// Runs scan cycles against one market data source.
pub struct Scanner<S: MarketDataSource> {
    source: S,
    builder: UniverseBuilder,
    engine: MetricEngine,
    cache: UniverseCache,
    interval: String,
    candle_limit: usize,
    concurrency: usize,
}

impl<S: MarketDataSource> Scanner<S> {
    pub fn new(source: S, builder: UniverseBuilder, engine: MetricEngine) -> Self {
        Self {
            source,
            builder,
            engine,
            cache: UniverseCache::new(),
            interval: "4h".to_string(),
            candle_limit: 300,
            concurrency: 1,
        }
    }

    pub fn from_config(source: S, config: &ScannerConfig) -> ScanResult<Self> {
        config.validate()?;
        Ok(Self::new(
            source,
            UniverseBuilder::from_config(config),
            MetricEngine::from_config(config)?,
        )
        .with_cache(UniverseCache::from_config(config)?)
        .with_candles(&config.interval, config.candle_limit)
        .with_concurrency(config.concurrency))
    }

    pub fn with_cache(mut self, cache: UniverseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_candles(mut self, interval: &str, limit: usize) -> Self {
        self.interval = interval.to_string();
        self.candle_limit = limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &UniverseCache {
        &self.cache
    }

    /// Forces the next scan to rebuild the universe.
    pub fn invalidate_universe(&mut self) {
        self.cache.invalidate();
    }

    pub async fn refresh_universe(&mut self) -> ScanResult<Vec<Symbol>> {
        self.cache.refresh(&self.builder, &self.source).await
    }

    /// One scan cycle. Fails only when the universe cannot be built.
    pub async fn scan(&mut self) -> ScanResult<ScanOutcome> {
        let universe = self.cache.get_or_load(&self.builder, &self.source).await?;
        let scanned_at = Utc::now();

        info!(
            "Scanning {} symbols ({} x {} candles, lookback {})",
            universe.len(),
            self.interval,
            self.candle_limit,
            self.engine.lookback()
        );

        let this = &*self;
        let results: Vec<(Symbol, ScanResult<MetricRecord>)> = stream::iter(universe.iter().cloned())
            .map(|symbol| async move {
                let result = this.evaluate(&symbol).await;
                (symbol, result)
            })
            .buffered(this.concurrency)
            .collect()
            .await;

        let (table, skipped) = rank_results(results);

        info!(
            "Scan complete: {} ranked, {} skipped",
            table.len(),
            skipped.len()
        );

        Ok(ScanOutcome {
            table,
            skipped,
            universe_size: universe.len(),
            scanned_at,
        })
    }

    async fn evaluate(&self, symbol: &Symbol) -> ScanResult<MetricRecord> {
        let candles = self
            .source
            .fetch_candles(symbol, &self.interval, self.candle_limit)
            .await?;
        self.engine.compute(symbol, &candles)
    }
}

/// Splits per-symbol results into the ranked table and the skipped list.
pub fn rank_results(
    results: Vec<(Symbol, ScanResult<MetricRecord>)>,
) -> (RankedTable, Vec<SkippedSymbol>) {
    let mut records = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();

    for (symbol, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(reason) => {
                match &reason {
                    ScanError::InsufficientHistory { .. } => {
                        debug!("Skipping {}: {}", symbol, reason)
                    }
                    _ => warn!("Skipping {}: {}", symbol, reason),
                }
                skipped.push(SkippedSymbol { symbol, reason });
            }
        }
    }

    (RankedTable::from_records(records), skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use common::models::{Candle, MarketListing, MarketType};
    use mockall::mock;

    mock! {
        pub Source {}

        #[async_trait]
        impl MarketDataSource for Source {
            async fn fetch_listings(&self) -> ScanResult<Vec<MarketListing>>;
            async fn fetch_candles(
                &self,
                symbol: &Symbol,
                interval: &str,
                limit: usize,
            ) -> ScanResult<Vec<Candle>>;
        }
    }

    fn listing(base: &str, volume: f64) -> MarketListing {
        MarketListing {
            symbol: Symbol::new(base, "USDT"),
            market_type: MarketType::Spot,
            trading: true,
            volume,
        }
    }

    fn series(len: usize, f: impl Fn(usize) -> f64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        (0..len)
            .map(|i| {
                let c = f(i);
                Candle::new(start + TimeDelta::hours(4 * i as i64), c, c, c, c, 10.0)
            })
            .collect()
    }

    fn scanner(mock: MockSource) -> Scanner<MockSource> {
        Scanner::new(mock, UniverseBuilder::new("USDT", 150), MetricEngine::new(24).unwrap())
            .with_concurrency(4)
    }

    #[tokio::test]
    async fn test_scan_ranks_and_reports_skips() {
        let mut mock = MockSource::new();
        mock.expect_fetch_listings().times(1).returning(|| {
            Ok(vec![
                listing("BTC", 400.0),
                listing("ETH", 300.0),
                listing("SOL", 200.0),
                listing("DOGE", 100.0),
            ])
        });
        mock.expect_fetch_candles()
            .times(4)
            .returning(|symbol, interval, limit| {
                assert_eq!(interval, "4h");
                assert_eq!(limit, 300);
                match symbol.base() {
                    "BTC" => Ok(series(300, |i| 100.0 - i as f64 * 0.1)),
                    "ETH" => Ok(series(300, |i| 100.0 + i as f64 * 0.1)),
                    "SOL" => Err(ScanError::DataUnavailable("klines for SOL/USDT: HTTP 500".into())),
                    _ => Ok(series(10, |_| 1.0)),
                }
            });

        let outcome = scanner(mock).scan().await.unwrap();

        let ranked: Vec<&str> = outcome.table.iter().map(|r| r.symbol.base()).collect();
        assert_eq!(ranked, vec!["ETH", "BTC"]);
        assert!(outcome.table.records()[0].score > outcome.table.records()[1].score);
        assert_eq!(outcome.universe_size, 4);

        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].symbol, Symbol::new("SOL", "USDT"));
        assert!(matches!(outcome.skipped[0].reason, ScanError::DataUnavailable(_)));
        assert_eq!(
            outcome.skipped[1].reason,
            ScanError::InsufficientHistory { have: 10, need: 25 }
        );
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_scan() {
        let mut mock = MockSource::new();
        mock.expect_fetch_listings()
            .returning(|| Err(ScanError::DataUnavailable("exchange info: timeout".into())));
        mock.expect_fetch_candles().times(0);

        let err = scanner(mock).scan().await.unwrap_err();
        assert!(matches!(err, ScanError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_no_qualifying_symbols_is_empty_table() {
        let mut mock = MockSource::new();
        mock.expect_fetch_listings()
            .returning(|| Ok(vec![listing("USDC", 1e9), listing("WBTC", 1e8)]));
        mock.expect_fetch_candles().times(0);

        let outcome = scanner(mock).scan().await.unwrap();
        assert!(outcome.table.is_empty());
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.universe_size, 0);
    }

    #[tokio::test]
    async fn test_ties_follow_universe_order() {
        let mut mock = MockSource::new();
        mock.expect_fetch_listings().returning(|| {
            Ok(vec![
                listing("CCC", 1.0),
                listing("AAA", 3.0),
                listing("BBB", 2.0),
            ])
        });
        mock.expect_fetch_candles()
            .returning(|_, _, _| Ok(series(50, |_| 5.0)));

        let outcome = scanner(mock).scan().await.unwrap();
        let ranked: Vec<&str> = outcome.table.iter().map(|r| r.symbol.base()).collect();
        assert_eq!(ranked, vec!["AAA", "BBB", "CCC"]);
    }

    #[tokio::test]
    async fn test_universe_cached_until_invalidated() {
        let mut mock = MockSource::new();
        mock.expect_fetch_listings()
            .times(2)
            .returning(|| Ok(vec![listing("BTC", 1.0)]));
        mock.expect_fetch_candles()
            .times(3)
            .returning(|_, _, _| Ok(series(30, |i| 1.0 + i as f64)));

        let mut scanner = scanner(mock);
        scanner.scan().await.unwrap();
        scanner.scan().await.unwrap();
        assert!(scanner.cache().built_at().is_some());

        scanner.invalidate_universe();
        assert!(scanner.cache().built_at().is_none());
        scanner.scan().await.unwrap();
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = ScannerConfig {
            lookback: 1,
            ..ScannerConfig::default()
        };
        assert!(Scanner::from_config(MockSource::new(), &config).is_err());
    }
}
