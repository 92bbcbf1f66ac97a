pub mod adapter;
pub mod binance;

pub use adapter::{ExchangeClient, ExchangeError};
pub use binance::BinanceSpotClient;
