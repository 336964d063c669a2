//! In-memory exchange for tests and paper trading.
//!
//! Orders rest without filling; tests steer fills by editing positions
//! directly. Failures are scripted per call so engine error-handling paths
//! are reachable without a venue.

use super::traits::{Exchange, ExchangeError, ExchangeResult};
use super::types::*;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    total_balance: Decimal,
    available_balance: Decimal,
    positions: HashMap<(String, PositionSide), PositionInfo>,
    open_orders: Vec<OpenOrder>,
    candles: HashMap<String, Vec<Candle>>,
    min_amounts: HashMap<String, Decimal>,
    /// Scripted failures consumed by the next submit/cancel calls.
    submit_errors: VecDeque<ExchangeError>,
    leverage_calls: Vec<(String, u32)>,
    hedge_mode: bool,
    /// Accepted intents, in submission order.
    submitted: Vec<(OrderIntent, bool)>,
    cancelled: Vec<String>,
}

/// Paper-trading venue.
pub struct MockExchange {
    state: Arc<RwLock<MockState>>,
    order_id_counter: AtomicU64,
}

impl MockExchange {
    pub fn new(initial_balance: Decimal) -> Self {
        let state = MockState {
            total_balance: initial_balance,
            available_balance: initial_balance,
            ..MockState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            order_id_counter: AtomicU64::new(1),
        }
    }

    fn next_order_id(&self) -> String {
        self.order_id_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    pub async fn set_balance(&self, total: Decimal, available: Decimal) {
        let mut state = self.state.write().await;
        state.total_balance = total;
        state.available_balance = available;
    }

    pub async fn set_position(
        &self,
        symbol: &str,
        side: PositionSide,
        amount: Decimal,
        entry_price: Decimal,
    ) {
        let mut state = self.state.write().await;
        if amount == Decimal::ZERO {
            state.positions.remove(&(symbol.to_string(), side));
        } else {
            state.positions.insert(
                (symbol.to_string(), side),
                PositionInfo {
                    symbol: symbol.to_string(),
                    position_side: side,
                    amount,
                    entry_price,
                    notional: amount * entry_price,
                },
            );
        }
    }

    pub async fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.state
            .write()
            .await
            .candles
            .insert(symbol.to_string(), candles);
    }

    pub async fn set_min_amount(&self, symbol: &str, min: Decimal) {
        self.state
            .write()
            .await
            .min_amounts
            .insert(symbol.to_string(), min);
    }

    /// Queue a failure for an upcoming `submit_order` call.
    pub async fn push_submit_error(&self, error: ExchangeError) {
        self.state.write().await.submit_errors.push_back(error);
    }

    pub async fn submitted(&self) -> Vec<(OrderIntent, bool)> {
        self.state.read().await.submitted.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.state.read().await.cancelled.clone()
    }

    pub async fn leverage_calls(&self) -> Vec<(String, u32)> {
        self.state.read().await.leverage_calls.clone()
    }

    pub async fn hedge_mode_enabled(&self) -> bool {
        self.state.read().await.hedge_mode
    }

    pub async fn open_order_count(&self) -> usize {
        self.state.read().await.open_orders.len()
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new(dec!(10000))
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn fetch_account_state(&self) -> ExchangeResult<AccountState> {
        let state = self.state.read().await;
        Ok(AccountState {
            total_balance: state.total_balance,
            available_balance: state.available_balance,
            positions: state.positions.values().cloned().collect(),
            open_orders: state.open_orders.clone(),
        })
    }

    async fn fetch_market(
        &self,
        symbol: &str,
        _timeframe: &str,
        lookback: u32,
    ) -> ExchangeResult<Vec<Candle>> {
        let state = self.state.read().await;
        let candles = state.candles.get(symbol).cloned().unwrap_or_default();
        let start = candles.len().saturating_sub(lookback as usize);
        Ok(candles[start..].to_vec())
    }

    async fn min_order_amount(&self, symbol: &str) -> ExchangeResult<Decimal> {
        let state = self.state.read().await;
        Ok(state
            .min_amounts
            .get(symbol)
            .copied()
            .unwrap_or(dec!(0.001)))
    }

    async fn submit_order(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck> {
        let mut state = self.state.write().await;
        if let Some(error) = state.submit_errors.pop_front() {
            return Err(error);
        }

        // read-before-write: only flag reduce-only when the live position
        // covers the requested amount
        let reduce_only = if intent.action.is_reducing() {
            let live = state
                .positions
                .get(&(intent.symbol.clone(), intent.position_side))
                .map(|p| p.amount)
                .unwrap_or(Decimal::ZERO);
            live >= intent.amount
        } else {
            false
        };

        let id = self.next_order_id();
        state.open_orders.push(OpenOrder {
            id: id.clone(),
            symbol: intent.symbol.clone(),
            price: intent.price,
            amount: intent.amount,
            side: intent.side,
            position_side: intent.position_side,
        });
        state.submitted.push((intent.clone(), reduce_only));

        debug!(
            symbol = %intent.symbol,
            side = %intent.side,
            price = %intent.price,
            reduce_only,
            "mock order accepted"
        );

        Ok(OrderAck {
            order_id: id,
            reduce_only,
            accepted_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, order_id: &str, _symbol: &str) -> ExchangeResult<()> {
        let mut state = self.state.write().await;
        let before = state.open_orders.len();
        state.open_orders.retain(|o| o.id != order_id);
        if state.open_orders.len() == before {
            return Err(ExchangeError::InvalidOrder(format!(
                "unknown order {order_id}"
            )));
        }
        state.cancelled.push(order_id.to_string());
        Ok(())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        self.state
            .write()
            .await
            .leverage_calls
            .push((symbol.to_string(), leverage));
        Ok(())
    }

    async fn enable_hedge_mode(&self) -> ExchangeResult<()> {
        self.state.write().await.hedge_mode = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(action: ActionKind, side: OrderSide, position_side: PositionSide) -> OrderIntent {
        OrderIntent {
            symbol: "ETHUSDT".into(),
            side,
            position_side,
            price: dec!(3000),
            amount: dec!(0.05),
            action,
        }
    }

    #[tokio::test]
    async fn orders_rest_until_cancelled() {
        let exchange = MockExchange::default();
        let ack = exchange
            .submit_order(&intent(ActionKind::GridAdd, OrderSide::Buy, PositionSide::Long))
            .await
            .unwrap();
        assert_eq!(exchange.open_order_count().await, 1);

        exchange.cancel_order(&ack.order_id, "ETHUSDT").await.unwrap();
        assert_eq!(exchange.open_order_count().await, 0);
        assert!(matches!(
            exchange.cancel_order(&ack.order_id, "ETHUSDT").await,
            Err(ExchangeError::InvalidOrder(_))
        ));
    }

    #[tokio::test]
    async fn reduce_only_requires_position_cover() {
        let exchange = MockExchange::default();

        // no position: close intent submits without the flag
        let ack = exchange
            .submit_order(&intent(
                ActionKind::PartialClose,
                OrderSide::Sell,
                PositionSide::Long,
            ))
            .await
            .unwrap();
        assert!(!ack.reduce_only);

        // covered position: the flag is applied
        exchange
            .set_position("ETHUSDT", PositionSide::Long, dec!(0.5), dec!(3000))
            .await;
        let ack = exchange
            .submit_order(&intent(
                ActionKind::PartialClose,
                OrderSide::Sell,
                PositionSide::Long,
            ))
            .await
            .unwrap();
        assert!(ack.reduce_only);

        // opening intents never carry the flag
        let ack = exchange
            .submit_order(&intent(ActionKind::GridAdd, OrderSide::Buy, PositionSide::Long))
            .await
            .unwrap();
        assert!(!ack.reduce_only);
    }

    #[tokio::test]
    async fn scripted_errors_surface_once() {
        let exchange = MockExchange::default();
        exchange.push_submit_error(ExchangeError::RateLimited).await;

        let first = exchange
            .submit_order(&intent(ActionKind::GridAdd, OrderSide::Buy, PositionSide::Long))
            .await;
        assert!(matches!(first, Err(ExchangeError::RateLimited)));

        let second = exchange
            .submit_order(&intent(ActionKind::GridAdd, OrderSide::Buy, PositionSide::Long))
            .await;
        assert!(second.is_ok());
    }
}
