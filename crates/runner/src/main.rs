use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, warn};

use common::config::ScannerConfig;
use common::logger;
use market_data::{BinanceClient, MarketDataSource};
use scanner::Scanner;
use scanner::export::{generate_text_report, save_csv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();

    let config = ScannerConfig::from_env().context("Invalid scanner configuration")?;
    info!(
        "Starting scanner: {} pairs on {} candles (limit {}, lookback {})",
        config.quote, config.interval, config.candle_limit, config.lookback
    );

    let client = BinanceClient::from_config(&config).context("Failed to create Binance client")?;
    let mut scanner = Scanner::from_config(client, &config)?;

    match config.repeat_secs {
        None => run_cycle(&mut scanner, &config).await,
        Some(secs) => {
            let mut interval = tokio::time::interval(Duration::from_secs(secs.max(1)));
            loop {
                interval.tick().await;
                if let Err(e) = run_cycle(&mut scanner, &config).await {
                    error!("Scan cycle failed: {:#}", e);
                }
            }
        }
    }
}

async fn run_cycle<S: MarketDataSource>(
    scanner: &mut Scanner<S>,
    config: &ScannerConfig,
) -> anyhow::Result<()> {
    let outcome = scanner.scan().await.context("Scan failed")?;

    if outcome.table.is_empty() {
        warn!(
            "No data: none of the {} universe symbols produced metrics",
            outcome.universe_size
        );
    }

    println!("{}", generate_text_report(&outcome, config.report_top));

    save_csv(&outcome.table, &config.output_path)
        .with_context(|| format!("Failed to write {}", config.output_path))?;
    info!(
        "Results saved to {} ({} rows)",
        config.output_path,
        outcome.table.len()
    );
    Ok(())
}
