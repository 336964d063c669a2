//! Grid ladder planning.
//!
//! Decides which new resting levels to add this cycle, given how deep the
//! live ladder already is. Buys sit below price and open the LONG leg,
//! sells sit above and open the SHORT leg. A confirmed entry bias fills the
//! favored side to depth first; otherwise sides alternate outward.

use crate::exchange::types::{ActionKind, OpenOrder, OrderIntent, OrderSide, PositionSide};
use crate::market::MarketSnapshot;
use crate::strategy::signal::EntrySignal;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Ladder geometry limits.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum resting orders per side (total ladder = `max_steps * 2`).
    pub max_steps: usize,
    /// Minimum price-fraction distance to an existing same-side order; a
    /// closer candidate level is skipped to avoid duplicate-order rejection.
    pub min_level_distance: Decimal,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: 6,
            min_level_distance: dec!(0.0005),
        }
    }
}

/// Plans grid-add intents for one cycle.
#[derive(Debug, Clone, Default)]
pub struct GridPlanner {
    config: PlannerConfig,
}

impl GridPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// New levels to add. Empty when the ladder is full, the amount is zero
    /// (sizer said skip), or the interval is unusable.
    pub fn plan(
        &self,
        snapshot: &MarketSnapshot,
        interval: Decimal,
        amount: Decimal,
        signal: &EntrySignal,
        open_orders: &[OpenOrder],
    ) -> Vec<OrderIntent> {
        let price = snapshot.price;
        if amount <= Decimal::ZERO || interval <= Decimal::ZERO || price <= Decimal::ZERO {
            return Vec::new();
        }

        let max_steps = self.config.max_steps;
        let mut buy_count = open_orders
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .count();
        let mut sell_count = open_orders.len() - buy_count;

        let mut buy_prices: Vec<Decimal> = open_orders
            .iter()
            .filter(|o| o.side == OrderSide::Buy)
            .map(|o| o.price)
            .collect();
        let mut sell_prices: Vec<Decimal> = open_orders
            .iter()
            .filter(|o| o.side == OrderSide::Sell)
            .map(|o| o.price)
            .collect();

        let mut intents = Vec::new();
        for (side, level) in self.candidate_order(signal, max_steps) {
            let step = Decimal::from(level as u64) * interval;
            let (level_price, count, prices) = match side {
                OrderSide::Buy => (price * (Decimal::ONE - step), &mut buy_count, &mut buy_prices),
                OrderSide::Sell => {
                    (price * (Decimal::ONE + step), &mut sell_count, &mut sell_prices)
                }
            };

            if *count >= max_steps {
                continue;
            }
            if self.collides(level_price, price, prices) {
                continue;
            }

            let position_side = match side {
                OrderSide::Buy => PositionSide::Long,
                OrderSide::Sell => PositionSide::Short,
            };
            intents.push(OrderIntent {
                symbol: snapshot.symbol.clone(),
                side,
                position_side,
                price: level_price,
                amount,
                action: ActionKind::GridAdd,
            });
            prices.push(level_price);
            *count += 1;
        }

        intents
    }

    /// Level visit order: bias-favored side first, otherwise interleaved.
    fn candidate_order(
        &self,
        signal: &EntrySignal,
        max_steps: usize,
    ) -> Vec<(OrderSide, usize)> {
        let buys = (1..=max_steps).map(|k| (OrderSide::Buy, k));
        let sells = (1..=max_steps).map(|k| (OrderSide::Sell, k));

        if signal.long {
            buys.chain(sells).collect()
        } else if signal.short {
            sells.chain(buys).collect()
        } else {
            let mut order = Vec::with_capacity(max_steps * 2);
            for k in 1..=max_steps {
                order.push((OrderSide::Buy, k));
                order.push((OrderSide::Sell, k));
            }
            order
        }
    }

    fn collides(&self, level_price: Decimal, price: Decimal, existing: &[Decimal]) -> bool {
        existing.iter().any(|p| {
            let distance = (level_price - *p).abs() / price;
            distance < self.config.min_level_distance
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{IndicatorExtras, MarketSnapshot};
    use chrono::Utc;

    fn snapshot(price: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETHUSDT".into(),
            timestamp: Utc::now(),
            price,
            ma: price,
            rsi: dec!(50),
            atr: dec!(30),
            recent_closes: vec![price, price],
            extras: IndicatorExtras::default(),
        }
    }

    fn neutral() -> EntrySignal {
        EntrySignal::neutral(10)
    }

    fn long_signal() -> EntrySignal {
        EntrySignal {
            long: true,
            short: false,
            score: 5,
            max_score: 10,
            conditions: vec![],
        }
    }

    fn open(side: OrderSide, price: Decimal) -> OpenOrder {
        OpenOrder {
            id: format!("{price}"),
            symbol: "ETHUSDT".into(),
            price,
            amount: dec!(0.03),
            side,
            position_side: match side {
                OrderSide::Buy => PositionSide::Long,
                OrderSide::Sell => PositionSide::Short,
            },
        }
    }

    #[test]
    fn empty_ladder_fills_both_sides_to_depth() {
        let planner = GridPlanner::default();
        let intents = planner.plan(&snapshot(dec!(3000)), dec!(0.002), dec!(0.03), &neutral(), &[]);
        assert_eq!(intents.len(), 12); // 6 per side
        let buys = intents.iter().filter(|i| i.side == OrderSide::Buy).count();
        assert_eq!(buys, 6);
        // first neutral candidate is the nearest buy level
        assert_eq!(intents[0].price, dec!(3000) * dec!(0.998));
        assert_eq!(intents[0].position_side, PositionSide::Long);
        assert_eq!(intents[0].action, ActionKind::GridAdd);
    }

    #[test]
    fn never_exceeds_per_side_depth() {
        let planner = GridPlanner::default();
        let existing: Vec<OpenOrder> = (1..=5)
            .map(|k| open(OrderSide::Buy, dec!(3000) - Decimal::from(100 * k)))
            .collect();
        let intents = planner.plan(
            &snapshot(dec!(3000)),
            dec!(0.002),
            dec!(0.03),
            &neutral(),
            &existing,
        );
        let new_buys = intents.iter().filter(|i| i.side == OrderSide::Buy).count();
        assert_eq!(new_buys, 1); // 5 resting + 1 = 6 max
        let new_sells = intents.iter().filter(|i| i.side == OrderSide::Sell).count();
        assert_eq!(new_sells, 6);
    }

    #[test]
    fn skips_levels_colliding_with_existing_orders() {
        let planner = GridPlanner::default();
        // resting buy exactly at the first grid level below price
        let existing = vec![open(OrderSide::Buy, dec!(3000) * dec!(0.998))];
        let intents = planner.plan(
            &snapshot(dec!(3000)),
            dec!(0.002),
            dec!(0.03),
            &neutral(),
            &existing,
        );
        assert!(intents
            .iter()
            .all(|i| (i.price - dec!(3000) * dec!(0.998)).abs() / dec!(3000) >= dec!(0.0005)));
    }

    #[test]
    fn opposite_side_does_not_collide() {
        let planner = GridPlanner::default();
        // a resting SELL at a buy-level price must not block the buy
        let existing = vec![open(OrderSide::Sell, dec!(3000) * dec!(0.998))];
        let intents = planner.plan(
            &snapshot(dec!(3000)),
            dec!(0.002),
            dec!(0.03),
            &neutral(),
            &existing,
        );
        assert!(intents
            .iter()
            .any(|i| i.side == OrderSide::Buy && i.price == dec!(3000) * dec!(0.998)));
    }

    #[test]
    fn long_bias_fills_buy_side_first() {
        let planner = GridPlanner::default();
        let intents = planner.plan(
            &snapshot(dec!(3000)),
            dec!(0.002),
            dec!(0.03),
            &long_signal(),
            &[],
        );
        assert!(intents[..6].iter().all(|i| i.side == OrderSide::Buy));
        assert!(intents[6..].iter().all(|i| i.side == OrderSide::Sell));
    }

    #[test]
    fn zero_amount_plans_nothing() {
        let planner = GridPlanner::default();
        assert!(planner
            .plan(&snapshot(dec!(3000)), dec!(0.002), Decimal::ZERO, &neutral(), &[])
            .is_empty());
    }
}
