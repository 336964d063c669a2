//! Domain types crossing the order-execution boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Position leg in hedge mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }

    /// Lowercase form used in cache keys and history records.
    pub fn key(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an intent is for. The tag drives reduce-only handling at the
/// boundary, the history record's `action` field, and the notification
/// event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    GridAdd,
    RebalanceLong,
    RebalanceShort,
    PartialClose,
    FullClose,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::GridAdd => "grid_add",
            ActionKind::RebalanceLong => "rebalance_long",
            ActionKind::RebalanceShort => "rebalance_short",
            ActionKind::PartialClose => "partial_close",
            ActionKind::FullClose => "full_close",
        }
    }

    /// Whether the boundary should attempt reduce-only submission.
    pub fn is_reducing(&self) -> bool {
        matches!(self, ActionKind::PartialClose | ActionKind::FullClose)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only mutation request the decision core produces. Carries no order
/// identity until the boundary accepts it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub position_side: PositionSide,
    pub price: Decimal,
    pub amount: Decimal,
    pub action: ActionKind,
}

impl OrderIntent {
    /// Notification event tag for the gate, one per action kind.
    pub fn event_type(&self) -> &'static str {
        self.action.as_str()
    }
}

/// A request to pull a resting order.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelIntent {
    pub symbol: String,
    pub order_id: String,
    /// Recorded as the history `action` when executed.
    pub reason: &'static str,
}

/// A resting order as reported by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub symbol: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub side: OrderSide,
    pub position_side: PositionSide,
}

/// One leg of a hedge-mode position. Amounts are reported as magnitudes;
/// the side carries the direction.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionInfo {
    pub symbol: String,
    pub position_side: PositionSide,
    pub amount: Decimal,
    pub entry_price: Decimal,
    /// Absolute notional value in quote currency.
    pub notional: Decimal,
}

/// Account view returned by `fetch_account_state`.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    /// Total wallet balance in quote currency (USDT).
    pub total_balance: Decimal,
    pub available_balance: Decimal,
    pub positions: Vec<PositionInfo>,
    pub open_orders: Vec<OpenOrder>,
}

impl AccountState {
    /// Magnitude of the position on one side of a symbol, zero when flat.
    pub fn position_amount(&self, symbol: &str, side: PositionSide) -> Decimal {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol && p.position_side == side)
            .map(|p| p.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Absolute notional of the position on one side of a symbol.
    pub fn position_value(&self, symbol: &str, side: PositionSide) -> Decimal {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol && p.position_side == side)
            .map(|p| p.notional)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_orders_for(&self, symbol: &str) -> Vec<OpenOrder> {
        self.open_orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect()
    }
}

/// OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Acknowledgement for an accepted order intent.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    /// Whether the boundary actually submitted with the reduce-only flag
    /// after confirming position cover.
    pub reduce_only: bool,
    pub accepted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reducing_actions() {
        assert!(!ActionKind::GridAdd.is_reducing());
        assert!(!ActionKind::RebalanceShort.is_reducing());
        assert!(ActionKind::PartialClose.is_reducing());
        assert!(ActionKind::FullClose.is_reducing());
    }

    #[test]
    fn account_state_lookup() {
        let state = AccountState {
            total_balance: dec!(10000),
            available_balance: dec!(9000),
            positions: vec![PositionInfo {
                symbol: "ETHUSDT".into(),
                position_side: PositionSide::Long,
                amount: dec!(0.5),
                entry_price: dec!(3000),
                notional: dec!(1500),
            }],
            open_orders: vec![],
        };
        assert_eq!(
            state.position_amount("ETHUSDT", PositionSide::Long),
            dec!(0.5)
        );
        assert_eq!(
            state.position_amount("ETHUSDT", PositionSide::Short),
            Decimal::ZERO
        );
        assert_eq!(
            state.position_value("ETHUSDT", PositionSide::Long),
            dec!(1500)
        );
    }
}
