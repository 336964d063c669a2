//! The order-execution boundary.
//!
//! Everything the decision engine needs from a venue, behind one async
//! trait so the engine runs identically against Binance USD-M futures or
//! the in-memory mock. Errors come back already classified into the four
//! kinds the engine reacts to differently.

use super::types::{AccountState, Candle, OrderAck, OrderIntent};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Classified execution-boundary failure.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Parameters rejected by the venue. Dropped, never retried this cycle.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Not enough margin/balance for the request. Dropped.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Venue asked us to slow down. The loop backs off and retries on the
    /// next scheduled cycle, never busy-retries.
    #[error("rate limited")]
    RateLimited,

    /// Anything else, message truncated for logs and alerts.
    #[error("exchange error: {0}")]
    Other(String),
}

impl ExchangeError {
    /// Stable tag used for notification event types and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::InvalidOrder(_) => "invalid_order",
            ExchangeError::InsufficientFunds(_) => "insufficient_funds",
            ExchangeError::RateLimited => "rate_limited",
            ExchangeError::Other(_) => "other",
        }
    }

    /// Build an `Other` with the message capped at 120 chars so one giant
    /// venue payload cannot flood logs or alerts.
    pub fn other(message: impl AsRef<str>) -> Self {
        let msg = message.as_ref();
        let truncated: String = msg.chars().take(120).collect();
        ExchangeError::Other(truncated)
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// A perpetual-futures venue.
///
/// `submit_order` owns the reduce-only decision: when the intent's action is
/// position-reducing, the implementation must first read the live
/// opposite-direction position and only set the reduce-only flag if its
/// magnitude covers the requested amount. Submitting reduce-only against an
/// uncovered position would either be rejected or flip the leg under hedge
/// mode, so the read-before-write is part of the contract.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Balances, positions and resting orders in one consistent view.
    async fn fetch_account_state(&self) -> ExchangeResult<AccountState>;

    /// OHLCV series for `symbol`, most recent candle last.
    async fn fetch_market(
        &self,
        symbol: &str,
        timeframe: &str,
        lookback: u32,
    ) -> ExchangeResult<Vec<Candle>>;

    /// Venue minimum order size (base asset) for a symbol.
    async fn min_order_amount(&self, symbol: &str) -> ExchangeResult<Decimal>;

    /// Submit a limit order built from an intent.
    async fn submit_order(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck>;

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ExchangeResult<()>;

    /// Idempotent, safe to call every startup.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()>;

    /// Idempotent, safe to call every startup.
    async fn enable_hedge_mode(&self) -> ExchangeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_truncates_long_messages() {
        let long = "x".repeat(500);
        match ExchangeError::other(&long) {
            ExchangeError::Other(msg) => assert_eq!(msg.len(), 120),
            _ => unreachable!(),
        }
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ExchangeError::RateLimited.kind(), "rate_limited");
        assert_eq!(
            ExchangeError::InvalidOrder("price".into()).kind(),
            "invalid_order"
        );
    }
}
