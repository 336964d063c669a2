//! Long/short value-ratio rebalancing.
//!
//! Keeps the two hedge-mode legs near a target split. The target defaults
//! to 50/50 and tilts with short-term momentum, clamped so the book never
//! leans harder than 70/30. At most one corrective intent per cycle, and
//! corrections below the venue minimum are dropped, not queued.

use crate::exchange::types::{ActionKind, OrderIntent, OrderSide, PositionSide};
use crate::utils::decimal::safe_div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

/// Ratio targets and correction sizing policy.
#[derive(Debug, Clone)]
pub struct HedgeConfig {
    /// Ratio deviation that triggers a correction.
    pub rebalance_threshold: Decimal,
    /// Minimum 1-candle momentum for the target to leave 0.5.
    pub min_momentum: Decimal,
    /// Momentum multiplier applied to the target shift.
    pub momentum_tilt: Decimal,
    /// Target ratio clamp bounds.
    pub ratio_floor: Decimal,
    pub ratio_ceiling: Decimal,
    /// Combined notional below this is too small to bother rebalancing.
    pub min_total_value: Decimal,
    /// Fraction of the imbalance corrected per cycle.
    pub adjustment_factor: Decimal,
    /// Correction cap as a fraction of combined notional.
    pub adjustment_cap: Decimal,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            rebalance_threshold: dec!(0.15),
            min_momentum: dec!(0.01),
            momentum_tilt: dec!(0.15),
            ratio_floor: dec!(0.3),
            ratio_ceiling: dec!(0.7),
            min_total_value: dec!(10),
            adjustment_factor: dec!(0.3),
            adjustment_cap: dec!(0.1),
        }
    }
}

/// Emits at most one corrective order intent per cycle.
#[derive(Debug, Clone, Default)]
pub struct HedgeRebalancer {
    config: HedgeConfig,
}

impl HedgeRebalancer {
    pub fn new(config: HedgeConfig) -> Self {
        Self { config }
    }

    /// Momentum-tilted target for the long share of total value, always in
    /// `[ratio_floor, ratio_ceiling]`.
    pub fn target_ratio(&self, closes: &[Decimal], price: Decimal) -> Decimal {
        let cfg = &self.config;
        let balanced = dec!(0.5);
        if closes.len() < 2 || price <= Decimal::ZERO {
            return balanced;
        }
        let prev_close = closes[closes.len() - 2];
        if prev_close <= Decimal::ZERO {
            return balanced;
        }
        let change = (price - prev_close) / prev_close;
        if change.abs() <= cfg.min_momentum {
            return balanced;
        }
        (balanced + change * cfg.momentum_tilt).clamp(cfg.ratio_floor, cfg.ratio_ceiling)
    }

    /// Corrective intent, or `None` when the book is balanced enough, too
    /// small, or the correction would be below the venue minimum.
    pub fn rebalance(
        &self,
        symbol: &str,
        long_value: Decimal,
        short_value: Decimal,
        closes: &[Decimal],
        price: Decimal,
        min_order_amount: Decimal,
    ) -> Option<OrderIntent> {
        let cfg = &self.config;
        let total = long_value + short_value;
        if total <= cfg.min_total_value || price <= Decimal::ZERO {
            return None;
        }

        let current_ratio = safe_div(long_value, total);
        let target_ratio = self.target_ratio(closes, price);
        let diff = (current_ratio - target_ratio).abs();

        debug!(
            symbol,
            %current_ratio,
            %target_ratio,
            %diff,
            "hedge ratio check"
        );

        if diff <= cfg.rebalance_threshold {
            return None;
        }

        let adjustment_value = (total * diff * cfg.adjustment_factor)
            .min(total * cfg.adjustment_cap);
        let adjustment_amount = adjustment_value / price;
        if adjustment_amount < min_order_amount {
            // dropped, not queued; the imbalance persists into next cycle
            return None;
        }

        // over-long corrects by adding to the short leg, and vice versa
        let (side, position_side, action) = if current_ratio > target_ratio {
            (OrderSide::Sell, PositionSide::Short, ActionKind::RebalanceShort)
        } else {
            (OrderSide::Buy, PositionSide::Long, ActionKind::RebalanceLong)
        };

        Some(OrderIntent {
            symbol: symbol.to_string(),
            side,
            position_side,
            price,
            amount: adjustment_amount,
            action,
        })
    }
}
