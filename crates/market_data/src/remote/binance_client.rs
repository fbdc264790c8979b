use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use common::config::ScannerConfig;
use common::error::{ScanError, ScanResult};
use common::models::{Candle, MarketListing, Symbol};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use crate::remote::kline_response::KlineRow;
use crate::remote::listing_response::{ExchangeInfoResponse, TickerResponse};
use crate::traits::{MarketDataSource, RemoteResponse};

const MAX_RETRIES: u32 = 3;
const MAX_IN_FLIGHT: usize = 5;
const WEIGHT_WARN_THRESHOLD: u32 = 1000;

#[derive(Debug, thiserror::Error)]
#[error("HTTP {status}: {reason}")]
struct RateLimited {
    status: u16,
    reason: &'static str,
}

/// Read-only REST client for the Binance spot API.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
    request_delay: Duration,
    next_slot: Mutex<Instant>,
}

impl BinanceClient {
    pub fn new(base_url: &str, request_delay_ms: u64) -> ScanResult<Self> {
        let client = Client::builder()
            .user_agent("momentum_scanner/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScanError::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
            request_delay: Duration::from_millis(request_delay_ms),
            next_slot: Mutex::new(Instant::now()),
        })
    }

    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        Self::new(&config.base_url, config.request_delay_ms)
    }

    /// Spaces requests `request_delay` apart across every caller of this client.
    async fn wait_for_slot(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.request_delay;
            slot
        };
        sleep_until(slot).await;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut retry_count = 0;

        loop {
            self.wait_for_slot().await;

            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .context("Failed to acquire semaphore permit")?;

            let result = self.make_request::<T>(&url, query).await;

            drop(permit);

            match result {
                Ok(data) => return Ok(data),
                Err(e) if e.downcast_ref::<RateLimited>().is_some() => {
                    retry_count += 1;
                    let Some(backoff) = retry_backoff(retry_count) else {
                        bail!("Max retries exceeded for {}: {}", path, e);
                    };

                    warn!(
                        "Rate limited on {}, backing off for {} seconds (attempt {}/{})",
                        path,
                        backoff.as_secs(),
                        retry_count,
                        MAX_RETRIES
                    );

                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RateLimited {
                status: status.as_u16(),
                reason: "Too Many Requests",
            }
            .into());
        }
        if status == StatusCode::IM_A_TEAPOT {
            return Err(RateLimited {
                status: status.as_u16(),
                reason: "IP has been auto-banned",
            }
            .into());
        }

        if let Some(used_weight) = response.headers().get("x-mbx-used-weight-1m") {
            let used_weight: u32 = used_weight
                .to_str()
                .context("Invalid weight header")?
                .parse()
                .context("Failed to parse weight")?;

            if used_weight > WEIGHT_WARN_THRESHOLD {
                warn!("High API weight usage: {}", used_weight);
            } else {
                debug!("Used weights: {}/6000", used_weight);
            }
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("HTTP {}: {}", status.as_u16(), error_text);
        }

        let data = response
            .json::<T>()
            .await
            .context("Failed to parse JSON response")?;
        Ok(data)
    }
}

/// Exponential backoff before retry `attempt` (1-based), `None` once retries are exhausted.
fn retry_backoff(attempt: u32) -> Option<Duration> {
    (attempt <= MAX_RETRIES).then(|| Duration::from_secs(2_u64.pow(attempt)))
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_listings(&self) -> ScanResult<Vec<MarketListing>> {
        let info: ExchangeInfoResponse = self
            .get_json("/api/v3/exchangeInfo", &[])
            .await
            .map_err(|e| ScanError::DataUnavailable(format!("exchange info: {:#}", e)))?;

        let tickers: Vec<TickerResponse> = self
            .get_json("/api/v3/ticker/24hr", &[])
            .await
            .map_err(|e| ScanError::DataUnavailable(format!("24h tickers: {:#}", e)))?;

        let mut volumes = HashMap::with_capacity(tickers.len());
        for ticker in &tickers {
            match ticker.to_domain() {
                Ok(volume) => {
                    volumes.insert(ticker.symbol.clone(), volume);
                }
                Err(e) => debug!("Dropping ticker row: {:#}", e),
            }
        }

        debug!(
            "Loaded {} listings and {} tickers",
            info.symbols.len(),
            volumes.len()
        );
        Ok(info.into_listings(&volumes))
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> ScanResult<Vec<Candle>> {
        let query = [
            ("symbol", symbol.pair()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];

        let rows: Vec<KlineRow> = self
            .get_json("/api/v3/klines", &query)
            .await
            .map_err(|e| ScanError::DataUnavailable(format!("klines for {}: {:#}", symbol, e)))?;

        rows.iter()
            .map(|row| row.to_domain())
            .collect::<anyhow::Result<Vec<Candle>>>()
            .map_err(|e| ScanError::DataUnavailable(format!("klines for {}: {:#}", symbol, e)))
    }
}
