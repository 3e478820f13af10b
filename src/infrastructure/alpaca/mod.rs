pub mod common;
pub mod execution;
pub mod market_data;

pub use common::AlpacaBar;
pub use execution::AlpacaBrokerage;
pub use market_data::AlpacaMarketDataService;
