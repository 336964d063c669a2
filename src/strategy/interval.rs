//! Dynamic grid spacing.
//!
//! The spacing between grid levels is a price-relative fraction derived
//! either from the live ladder's own average gap (when at least two orders
//! rest) or from ATR volatility banding. This feeds the control loop every
//! cycle and therefore never fails: malformed inputs yield a fixed fallback.

use crate::exchange::types::OpenOrder;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Bounds and bands for interval derivation.
#[derive(Debug, Clone)]
pub struct IntervalConfig {
    /// Tightest allowed spacing as a price fraction.
    pub min: Decimal,
    /// Widest allowed spacing as a price fraction.
    pub max: Decimal,
    /// Hard floor that no input combination may undercut.
    pub absolute_floor: Decimal,
    /// Returned unchanged when price or ATR is non-positive.
    pub fallback: Decimal,
    /// ATR/price below this is "low volatility" (maps to `min`).
    pub band_low: Decimal,
    /// ATR/price above this is "high volatility" (maps to `max`).
    pub band_high: Decimal,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            min: dec!(0.0012),
            max: dec!(0.0020),
            absolute_floor: dec!(0.0005),
            fallback: dec!(0.0012),
            band_low: dec!(0.01),
            band_high: dec!(0.03),
        }
    }
}

/// Derives the current grid spacing.
#[derive(Debug, Clone, Default)]
pub struct GridIntervalCalculator {
    config: IntervalConfig,
}

impl GridIntervalCalculator {
    pub fn new(config: IntervalConfig) -> Self {
        Self { config }
    }

    /// Spacing as a price fraction, always within
    /// `[absolute_floor.max(min), max]` for valid inputs.
    pub fn compute_interval(
        &self,
        price: Decimal,
        atr: Decimal,
        open_orders: &[OpenOrder],
    ) -> Decimal {
        let cfg = &self.config;
        if price <= Decimal::ZERO || atr <= Decimal::ZERO {
            return cfg.fallback;
        }

        let target = if open_orders.len() >= 2 {
            // The resting ladder already encodes a spacing; follow it.
            let mut min_price = open_orders[0].price;
            let mut max_price = open_orders[0].price;
            for order in open_orders {
                min_price = min_price.min(order.price);
                max_price = max_price.max(order.price);
            }
            let avg_gap =
                (max_price - min_price) / Decimal::from((open_orders.len() - 1) as u64);
            (avg_gap / price).clamp(cfg.min, cfg.max)
        } else {
            let atr_pct = atr / price;
            if atr_pct > cfg.band_high {
                cfg.max
            } else if atr_pct < cfg.band_low {
                cfg.min
            } else {
                let ratio = (atr_pct - cfg.band_low) / (cfg.band_high - cfg.band_low);
                cfg.min + ratio * (cfg.max - cfg.min)
            }
        };

        target.max(cfg.absolute_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::types::{OrderSide, PositionSide};

    fn order(price: Decimal) -> OpenOrder {
        OpenOrder {
            id: "1".into(),
            symbol: "ETHUSDT".into(),
            price,
            amount: dec!(0.03),
            side: OrderSide::Buy,
            position_side: PositionSide::Long,
        }
    }

    fn calc() -> GridIntervalCalculator {
        GridIntervalCalculator::default()
    }

    #[test]
    fn ladder_gap_is_clamped_to_max() {
        // orders at 2990..3020, avg gap 10 -> 10/3000 = 0.00333, above MAX
        let orders: Vec<OpenOrder> = [2990, 3000, 3010, 3020]
            .iter()
            .map(|p| order(Decimal::from(*p)))
            .collect();
        let interval = calc().compute_interval(dec!(3000), dec!(30), &orders);
        assert_eq!(interval, dec!(0.0020));
    }

    #[test]
    fn high_volatility_maps_to_max() {
        // atr_pct = 120/3000 = 0.04 > 0.03
        let interval = calc().compute_interval(dec!(3000), dec!(120), &[]);
        assert_eq!(interval, dec!(0.0020));
    }

    #[test]
    fn low_volatility_maps_to_min() {
        // atr_pct = 15/3000 = 0.005 < 0.01
        let interval = calc().compute_interval(dec!(3000), dec!(15), &[]);
        assert_eq!(interval, dec!(0.0012));
    }

    #[test]
    fn mid_volatility_interpolates() {
        // atr_pct = 60/3000 = 0.02, exactly mid-band -> midpoint of [min, max]
        let interval = calc().compute_interval(dec!(3000), dec!(60), &[]);
        assert_eq!(interval, dec!(0.0016));
    }

    #[test]
    fn malformed_inputs_fall_back() {
        let c = calc();
        assert_eq!(c.compute_interval(Decimal::ZERO, dec!(30), &[]), dec!(0.0012));
        assert_eq!(c.compute_interval(dec!(3000), dec!(-1), &[]), dec!(0.0012));
    }

    #[test]
    fn output_never_below_floor() {
        let cfg = IntervalConfig {
            min: dec!(0.0001),
            max: dec!(0.0003),
            ..IntervalConfig::default()
        };
        let c = GridIntervalCalculator::new(cfg);
        for atr in [dec!(1), dec!(10), dec!(30), dec!(60), dec!(200)] {
            let interval = c.compute_interval(dec!(3000), atr, &[]);
            assert!(interval >= dec!(0.0005), "atr={atr} interval={interval}");
        }
    }

    #[test]
    fn single_order_uses_volatility_banding() {
        let orders = vec![order(dec!(2990))];
        let interval = calc().compute_interval(dec!(3000), dec!(15), &orders);
        assert_eq!(interval, dec!(0.0012));
    }
}
