//! Equity-based order sizing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Minimum-notional policy.
#[derive(Debug, Clone)]
pub struct SizerConfig {
    /// Fixed notional floor in quote currency.
    pub min_notional_floor: Decimal,
    /// Dynamic floor factor: `price * factor * leverage`.
    pub dynamic_min_factor: Decimal,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            min_notional_floor: dec!(25),
            dynamic_min_factor: dec!(0.001),
        }
    }
}

/// Converts account equity and risk fraction into a base-asset amount.
#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    config: SizerConfig,
}

impl PositionSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    /// Order amount in base asset. Zero means "skip this cycle", not an
    /// error: callers get zero for non-positive equity or price.
    pub fn compute_amount(
        &self,
        equity: Decimal,
        price: Decimal,
        size_fraction: Decimal,
        leverage: u32,
    ) -> Decimal {
        if equity <= Decimal::ZERO || price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut position_notional = equity * size_fraction;
        let min_notional = self
            .config
            .min_notional_floor
            .max(price * self.config.dynamic_min_factor * Decimal::from(leverage));
        if position_notional < min_notional {
            position_notional = min_notional;
        }

        position_notional / price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_sizing() {
        // equity 10000 * 1% = 100 notional; dynamic floor = 3000*0.001*5 = 15,
        // fixed floor 25 -> min_notional 25; 100 stands -> 100/3000
        let sizer = PositionSizer::default();
        let amount = sizer.compute_amount(dec!(10000), dec!(3000), dec!(0.01), 5);
        assert_eq!(amount.round_dp(5), dec!(0.03333));
    }

    #[test]
    fn small_equity_raised_to_min_notional() {
        // 100 * 1% = 1 notional, below floor 25 -> amount = 25/3000
        let sizer = PositionSizer::default();
        let amount = sizer.compute_amount(dec!(100), dec!(3000), dec!(0.01), 5);
        assert_eq!(amount.round_dp(6), dec!(0.008333));
    }

    #[test]
    fn dynamic_floor_can_exceed_fixed_floor() {
        // price 60000, leverage 5 -> dynamic floor 300 beats fixed 25
        let sizer = PositionSizer::default();
        let amount = sizer.compute_amount(dec!(10000), dec!(60000), dec!(0.001), 5);
        assert_eq!(amount, dec!(0.005)); // 300/60000
    }

    #[test]
    fn non_positive_inputs_mean_skip() {
        let sizer = PositionSizer::default();
        assert_eq!(
            sizer.compute_amount(Decimal::ZERO, dec!(3000), dec!(0.01), 5),
            Decimal::ZERO
        );
        assert_eq!(
            sizer.compute_amount(dec!(10000), Decimal::ZERO, dec!(0.01), 5),
            Decimal::ZERO
        );
        assert_eq!(
            sizer.compute_amount(dec!(-50), dec!(3000), dec!(0.01), 5),
            Decimal::ZERO
        );
    }

    #[test]
    fn positive_inputs_always_cover_min_notional() {
        let sizer = PositionSizer::default();
        for equity in [dec!(1), dec!(100), dec!(10000), dec!(1_000_000)] {
            let amount = sizer.compute_amount(equity, dec!(3000), dec!(0.01), 5);
            assert!(amount > Decimal::ZERO);
            assert!(amount * dec!(3000) >= dec!(25));
        }
    }
}
