//! Plain-text report bodies for the periodic status and daily summaries.

use rust_decimal::Decimal;

/// Last observed state of one instrument, filled in by the trading cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentStatus {
    pub symbol: String,
    pub price: Decimal,
    pub long_value: Decimal,
    pub short_value: Decimal,
    pub open_orders: usize,
}

/// Daily summary input for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    pub symbol: String,
    pub net_value: Decimal,
    pub trades_today: usize,
}

pub fn status_report(entries: &[InstrumentStatus]) -> String {
    let mut report = String::new();
    for entry in entries {
        report.push_str(&format!(
            "\n📊 {} status\n\
             - price: ${:.2}\n\
             - long: ${:.2}\n\
             - short: ${:.2}\n\
             - open orders: {}\n",
            entry.symbol, entry.price, entry.long_value, entry.short_value, entry.open_orders
        ));
    }
    report
}

pub fn daily_report(entries: &[InstrumentSummary]) -> String {
    let mut total = Decimal::ZERO;
    let mut report = String::from("[daily summary]\n");
    for entry in entries {
        total += entry.net_value;
        report.push_str(&format!(
            "- {}: {:.2} USDT across {} trades\n",
            entry.symbol, entry.net_value, entry.trades_today
        ));
    }
    report.push_str(&format!("💰 total position value: {total:.2} USDT"));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_report_lists_each_instrument() {
        let report = status_report(&[InstrumentStatus {
            symbol: "ETHUSDT".into(),
            price: dec!(3000.5),
            long_value: dec!(150.25),
            short_value: dec!(148.75),
            open_orders: 8,
        }]);
        assert!(report.contains("ETHUSDT"));
        assert!(report.contains("$3000.50"));
        assert!(report.contains("open orders: 8"));
    }

    #[test]
    fn daily_report_totals_across_instruments() {
        let report = daily_report(&[
            InstrumentSummary {
                symbol: "ETHUSDT".into(),
                net_value: dec!(120.5),
                trades_today: 12,
            },
            InstrumentSummary {
                symbol: "BTCUSDT".into(),
                net_value: dec!(80.25),
                trades_today: 3,
            },
        ]);
        assert!(report.contains("ETHUSDT: 120.50 USDT across 12 trades"));
        assert!(report.contains("total position value: 200.75 USDT"));
    }
}
