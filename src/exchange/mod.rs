//! Order-execution boundary: the `Exchange` trait, its domain types, the
//! live Binance USD-M client and the in-memory mock.

mod binance;
mod mock;
pub mod traits;
pub mod types;

pub use binance::BinanceExchange;
pub use mock::MockExchange;
pub use traits::{Exchange, ExchangeError, ExchangeResult};
pub use types::*;
