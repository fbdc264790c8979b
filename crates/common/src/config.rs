use std::env;
use std::str::FromStr;

use crate::error::{ScanError, ScanResult};

const KLINE_INTERVALS: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

const MAX_CANDLE_LIMIT: usize = 1000;

/// Largest TTL a `chrono::TimeDelta` can hold, in whole seconds.
pub const MAX_UNIVERSE_TTL_SECS: u64 = i64::MAX as u64 / 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub base_url: String,
    pub quote: String,
    pub interval: String,
    pub candle_limit: usize,
    pub lookback: usize,
    pub universe_limit: usize,
    pub concurrency: usize,
    pub request_delay_ms: u64,
    pub universe_ttl_secs: Option<u64>,
    pub extra_excludes: Vec<String>,
    pub output_path: String,
    pub report_top: usize,
    pub repeat_secs: Option<u64>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            quote: "USDT".to_string(),
            interval: "4h".to_string(),
            candle_limit: 300,
            lookback: 24,
            universe_limit: 150,
            concurrency: 4,
            request_delay_ms: 100,
            universe_ttl_secs: None,
            extra_excludes: Vec::new(),
            output_path: "scanner_output.csv".to_string(),
            report_top: 20,
            repeat_secs: None,
        }
    }
}

impl ScannerConfig {
    /// Reads `BINANCE_BASE_URL` and the `SCANNER_*` variables, falling back to defaults.
    pub fn from_env() -> ScanResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ScanResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Self {
            base_url: get("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            quote: get("SCANNER_QUOTE")
                .map(|q| q.to_uppercase())
                .unwrap_or(defaults.quote),
            interval: get("SCANNER_INTERVAL").unwrap_or(defaults.interval),
            candle_limit: parse_or(get("SCANNER_CANDLE_LIMIT"), "SCANNER_CANDLE_LIMIT", defaults.candle_limit)?,
            lookback: parse_or(get("SCANNER_LOOKBACK"), "SCANNER_LOOKBACK", defaults.lookback)?,
            universe_limit: parse_or(
                get("SCANNER_UNIVERSE_LIMIT"),
                "SCANNER_UNIVERSE_LIMIT",
                defaults.universe_limit,
            )?,
            concurrency: parse_or(get("SCANNER_CONCURRENCY"), "SCANNER_CONCURRENCY", defaults.concurrency)?,
            request_delay_ms: parse_or(
                get("SCANNER_REQUEST_DELAY_MS"),
                "SCANNER_REQUEST_DELAY_MS",
                defaults.request_delay_ms,
            )?,
            universe_ttl_secs: parse_opt(get("SCANNER_UNIVERSE_TTL_SECS"), "SCANNER_UNIVERSE_TTL_SECS")?,
            extra_excludes: get("SCANNER_EXTRA_EXCLUDES")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_uppercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            output_path: get("SCANNER_OUTPUT").unwrap_or(defaults.output_path),
            report_top: parse_or(get("SCANNER_TOP"), "SCANNER_TOP", defaults.report_top)?,
            repeat_secs: parse_opt(get("SCANNER_REPEAT_SECS"), "SCANNER_REPEAT_SECS")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ScanResult<()> {
        if !KLINE_INTERVALS.contains(&self.interval.as_str()) {
            return Err(ScanError::InvalidConfig(format!(
                "unsupported kline interval '{}'",
                self.interval
            )));
        }
        if self.candle_limit == 0 || self.candle_limit > MAX_CANDLE_LIMIT {
            return Err(ScanError::InvalidConfig(format!(
                "candle limit must be within 1..={}, got {}",
                MAX_CANDLE_LIMIT, self.candle_limit
            )));
        }
        if self.lookback < 2 || self.lookback >= self.candle_limit {
            return Err(ScanError::InvalidConfig(format!(
                "lookback must be at least 2 and below the candle limit ({}), got {}",
                self.candle_limit, self.lookback
            )));
        }
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        if let Some(ttl) = self.universe_ttl_secs.filter(|&ttl| ttl > MAX_UNIVERSE_TTL_SECS) {
            return Err(ScanError::InvalidConfig(format!(
                "universe TTL must be at most {} seconds, got {}",
                MAX_UNIVERSE_TTL_SECS, ttl
            )));
        }
        if self.quote.is_empty() {
            return Err(ScanError::InvalidConfig("quote asset is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> ScanResult<T> {
    match raw {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ScanError::InvalidConfig(format!("{key}: cannot parse '{value}'"))),
        None => Ok(default),
    }
}

fn parse_opt<T: FromStr>(raw: Option<String>, key: &str) -> ScanResult<Option<T>> {
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|_| ScanError::InvalidConfig(format!("{key}: cannot parse '{value}'")))
    })
    .transpose()
}
