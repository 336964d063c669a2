//! # Grid Pilot
//!
//! An automated grid-trading and hedging engine for perpetual futures on
//! Binance USD-M.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `cache`: TTL caches for venue reads
//! - `market`: Candle-derived market snapshots and indicators
//! - `strategy`: Grid spacing, sizing, entry scoring and ladder planning
//! - `risk`: Hedge rebalancing, exposure capping and position timeouts
//! - `exchange`: The order-execution boundary (Binance client + mock)
//! - `engine`: The per-instrument decision cycle and outer loop
//! - `notify`: Throttled Telegram/log notifications
//! - `history`: Day-file trade history
//! - `utils`: Clock abstraction and decimal helpers

pub mod cache;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod history;
pub mod market;
pub mod notify;
pub mod risk;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use engine::Engine;
