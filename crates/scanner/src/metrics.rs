//! Rolling-window metrics and the composite score.
//!
//! Every division by a historical price, a mean or a standard deviation falls
//! back to `0.0` when the divisor is zero or the result is not finite.

use common::config::ScannerConfig;
use common::error::{ScanError, ScanResult};
use common::models::{Candle, MetricRecord, Symbol};
use ta::Next;
use ta::indicators::Maximum;

const BREAKOUT_WEIGHT: f64 = 0.5;
const CHANGE_WEIGHT: f64 = 0.3;
const VOL_Z_WEIGHT: f64 = 0.1;
const STRENGTH_WEIGHT: f64 = 0.1;

const PERCENT_BOUND: f64 = 50.0;
const RATIO_BOUND: f64 = 5.0;

const PRICE_DECIMALS: i32 = 6;
const METRIC_DECIMALS: i32 = 2;

/// Unrounded metric values for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMetrics {
    pub last_price: f64,
    pub pct_change: f64,
    pub breakout: f64,
    pub vol_z: f64,
    pub vol_breakout: f64,
    pub relative_strength: f64,
    pub score: f64,
}

impl RawMetrics {
    pub fn into_record(self, symbol: Symbol) -> MetricRecord {
        MetricRecord {
            symbol,
            last_price: round_to(self.last_price, PRICE_DECIMALS),
            pct_change: round_to(self.pct_change, METRIC_DECIMALS),
            breakout: round_to(self.breakout, METRIC_DECIMALS),
            vol_z: round_to(self.vol_z, METRIC_DECIMALS),
            vol_breakout: round_to(self.vol_breakout, METRIC_DECIMALS),
            relative_strength: round_to(self.relative_strength, METRIC_DECIMALS),
            score: round_to(self.score, METRIC_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricEngine {
    lookback: usize,
}

impl MetricEngine {
    pub fn new(lookback: usize) -> ScanResult<Self> {
        if lookback < 2 {
            return Err(ScanError::InvalidConfig(format!(
                "lookback must be at least 2, got {}",
                lookback
            )));
        }
        Ok(Self { lookback })
    }

    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        Self::new(config.lookback)
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Minimum number of candles `compute` accepts.
    pub fn required_candles(&self) -> usize {
        self.lookback + 1
    }

    pub fn compute(&self, symbol: &Symbol, candles: &[Candle]) -> ScanResult<MetricRecord> {
        self.compute_raw(candles).map(|raw| raw.into_record(symbol.clone()))
    }

    pub fn compute_raw(&self, candles: &[Candle]) -> ScanResult<RawMetrics> {
        let n = self.lookback;
        let len = candles.len();
        if len < self.required_candles() {
            return Err(ScanError::InsufficientHistory {
                have: len,
                need: self.required_candles(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let last = closes[len - 1];

        let pct_change = percent_change(last, closes[len - n]);

        // Window of n highs ending at the candle before the current one.
        let mut maximum =
            Maximum::new(n).map_err(|e| ScanError::InvalidConfig(format!("rolling high: {:?}", e)))?;
        let mut recent_high = 0.0;
        for candle in &candles[..len - 1] {
            recent_high = maximum.next(candle.high);
        }
        let breakout = percent_change(last, recent_high);

        let returns = simple_returns(&closes);

        let abs_recent: Vec<f64> = returns[returns.len() - n..].iter().map(|r| r.abs()).collect();
        let vol_z = zscore(&abs_recent);

        let rolling = rolling_std(&returns, n);
        let vol_breakout = zscore(&rolling[rolling.len().saturating_sub(n)..]);

        let average_close = mean(&closes);
        let relative_strength = if average_close == 0.0 {
            0.0
        } else {
            finite_or_zero(last / average_close - 1.0)
        };

        Ok(RawMetrics {
            last_price: last,
            pct_change,
            breakout,
            vol_z,
            vol_breakout,
            relative_strength,
            score: composite(breakout, pct_change, vol_z, relative_strength),
        })
    }
}

/// Fixed-weight sum of the clipped components.
pub fn composite(breakout: f64, pct_change: f64, vol_z: f64, relative_strength: f64) -> f64 {
    BREAKOUT_WEIGHT * breakout.clamp(-PERCENT_BOUND, PERCENT_BOUND)
        + CHANGE_WEIGHT * pct_change.clamp(-PERCENT_BOUND, PERCENT_BOUND)
        + VOL_Z_WEIGHT * vol_z.clamp(-RATIO_BOUND, RATIO_BOUND)
        + STRENGTH_WEIGHT * relative_strength.clamp(-RATIO_BOUND, RATIO_BOUND)
}

/// `(last - mean) / std` of the window; `0.0` for fewer than two points or zero spread.
pub fn zscore(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let std = sample_std(values);
    if !std.is_finite() || std <= f64::EPSILON {
        return 0.0;
    }
    let z = (values[values.len() - 1] - mean(values)) / std;
    if z.is_finite() { z } else { 0.0 }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `n - 1` in the denominator.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Close-to-close fractional returns; one shorter than `closes`.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] == 0.0 { 0.0 } else { finite_or_zero(w[1] / w[0] - 1.0) })
        .collect()
}

/// Sample std of every full window of `window` values, oldest first.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values.windows(window).map(sample_std).collect()
}

fn percent_change(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    finite_or_zero((current - reference) / reference * 100.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    // `+ 0.0` folds negative zero into zero.
    finite_or_zero((value * factor).round() / factor) + 0.0
}
