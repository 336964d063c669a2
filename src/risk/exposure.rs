//! Notional exposure cap.
//!
//! When combined long+short notional exceeds the configured multiple of
//! account equity, the guard trims the ladder by cancelling the resting
//! orders farthest from the current price. Cancellations are bounded per
//! cycle so one breach never rips out the whole grid.

use crate::exchange::types::{CancelIntent, OpenOrder};
use crate::utils::decimal::safe_div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ExposureConfig {
    /// Maximum (long_value + short_value) / total_balance.
    pub max_exposure: Decimal,
    /// Cancellations allowed per cycle.
    pub max_cancels_per_cycle: usize,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            max_exposure: dec!(3.0),
            max_cancels_per_cycle: 2,
        }
    }
}

/// Caps total exposure relative to equity.
#[derive(Debug, Clone, Default)]
pub struct ExposureGuard {
    config: ExposureConfig,
}

impl ExposureGuard {
    pub fn new(config: ExposureConfig) -> Self {
        Self { config }
    }

    /// Cancellations to apply this cycle, farthest-from-price first. Empty
    /// when exposure is within bounds or the balance is non-positive.
    pub fn enforce(
        &self,
        total_balance: Decimal,
        long_value: Decimal,
        short_value: Decimal,
        price: Decimal,
        open_orders: &[OpenOrder],
    ) -> Vec<CancelIntent> {
        if price <= Decimal::ZERO {
            return Vec::new();
        }

        // a zero or negative balance never reads as a breach
        let exposure_ratio = safe_div(long_value + short_value, total_balance.max(Decimal::ZERO));
        if exposure_ratio <= self.config.max_exposure {
            return Vec::new();
        }

        info!(
            %exposure_ratio,
            max = %self.config.max_exposure,
            open_orders = open_orders.len(),
            "exposure cap breached, trimming farthest orders"
        );

        let mut ranked: Vec<(&OpenOrder, Decimal)> = open_orders
            .iter()
            .map(|o| (o, (o.price - price).abs() / price))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        ranked
            .into_iter()
            .take(self.config.max_cancels_per_cycle)
            .map(|(order, _)| CancelIntent {
                symbol: order.symbol.clone(),
                order_id: order.id.clone(),
                reason: "exposure_trim",
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::types::{OrderSide, PositionSide};

    fn order(id: &str, price: Decimal) -> OpenOrder {
        OpenOrder {
            id: id.into(),
            symbol: "ETHUSDT".into(),
            price,
            amount: dec!(0.03),
            side: OrderSide::Buy,
            position_side: PositionSide::Long,
        }
    }

    #[test]
    fn breach_cancels_two_farthest() {
        let guard = ExposureGuard::default();
        let orders = vec![
            order("near", dec!(3005)),
            order("far", dec!(3200)),
            order("mid", dec!(2950)),
            order("farthest", dec!(2700)),
        ];
        // (2000 + 2500) / 1000 = 4.5 > 3.0
        let cancels = guard.enforce(dec!(1000), dec!(2000), dec!(2500), dec!(3000), &orders);
        assert_eq!(cancels.len(), 2);
        assert_eq!(cancels[0].order_id, "farthest");
        assert_eq!(cancels[1].order_id, "far");
        assert_eq!(cancels[0].reason, "exposure_trim");
    }

    #[test]
    fn within_cap_is_noop() {
        let guard = ExposureGuard::default();
        let orders = vec![order("a", dec!(2700))];
        let cancels = guard.enforce(dec!(1000), dec!(1000), dec!(1500), dec!(3000), &orders);
        assert!(cancels.is_empty());
    }

    #[test]
    fn zero_balance_is_noop() {
        let guard = ExposureGuard::default();
        let orders = vec![order("a", dec!(2700))];
        assert!(guard
            .enforce(Decimal::ZERO, dec!(2000), dec!(2500), dec!(3000), &orders)
            .is_empty());
        assert!(guard
            .enforce(dec!(-50), dec!(2000), dec!(2500), dec!(3000), &orders)
            .is_empty());
    }

    #[test]
    fn never_cancels_more_than_limit() {
        let guard = ExposureGuard::default();
        let orders: Vec<OpenOrder> = (0..10)
            .map(|i| order(&format!("{i}"), dec!(3000) + Decimal::from(i * 10)))
            .collect();
        let cancels = guard.enforce(dec!(1000), dec!(9000), dec!(1000), dec!(3000), &orders);
        assert_eq!(cancels.len(), 2);
    }

    #[test]
    fn fewer_orders_than_limit() {
        let guard = ExposureGuard::default();
        let orders = vec![order("only", dec!(3100))];
        let cancels = guard.enforce(dec!(1000), dec!(4000), dec!(1000), dec!(3000), &orders);
        assert_eq!(cancels.len(), 1);
    }
}
