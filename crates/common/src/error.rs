use thiserror::Error;

/// Failures surfaced by the scanning pipeline.
///
/// Degenerate statistics (zero variance, zero reference prices) are not
/// represented here: they resolve to `0.0` where they occur.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("insufficient history: have {have} candles, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("export failed: {0}")]
    Export(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
