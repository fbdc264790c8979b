pub mod binance_client;
pub mod kline_response;
pub mod listing_response;

pub use binance_client::BinanceClient;
pub use kline_response::KlineRow;
pub use listing_response::{ExchangeInfoResponse, SymbolInfo, TickerResponse};
