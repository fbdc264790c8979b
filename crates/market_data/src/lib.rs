pub mod remote;
pub mod traits;

pub use remote::BinanceClient;
pub use traits::MarketDataSource;
