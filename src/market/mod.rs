//! Market snapshot assembly and the indicator arithmetic behind it.
//!
//! The decision components consume already-computed numbers (MA, RSI, ATR,
//! momentum closes); this module turns a fetched candle series into that
//! snapshot once per cycle. A snapshot is never mutated after creation.

use crate::exchange::types::Candle;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Optional indicators consumed by the entry signal rule table. Anything the
/// host does not compute stays `None` and simply contributes no score.
#[derive(Debug, Clone, Default)]
pub struct IndicatorExtras {
    pub adx: Option<Decimal>,
    pub cci: Option<Decimal>,
    pub mfi: Option<Decimal>,
    pub stoch_k: Option<Decimal>,
    pub stoch_d: Option<Decimal>,
    /// Bollinger band width relative to its recent average (>1 = expanding).
    pub bb_expansion: Option<Decimal>,
    /// Last candle volume relative to average volume.
    pub volume_ratio: Option<Decimal>,
    /// Trend agreement on a higher timeframe, where available.
    pub higher_tf_trend_up: Option<bool>,
}

/// Immutable per-cycle view of one instrument's market state.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub ma: Decimal,
    pub rsi: Decimal,
    pub atr: Decimal,
    /// Most recent closes, oldest first; at least two for momentum.
    pub recent_closes: Vec<Decimal>,
    pub extras: IndicatorExtras,
}

impl MarketSnapshot {
    /// Build a snapshot from a candle series. Returns `None` when the series
    /// is too short for the configured MA period.
    pub fn from_candles(
        symbol: &str,
        timestamp: DateTime<Utc>,
        price: Decimal,
        candles: &[Candle],
        ma_period: usize,
        rsi_period: usize,
        atr_period: usize,
    ) -> Option<Self> {
        if candles.len() < ma_period || candles.len() < 2 {
            return None;
        }
        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

        let ma = sma(&closes, ma_period)?;
        let rsi = rsi(&closes, rsi_period).unwrap_or(dec!(50));
        let atr = atr(candles, atr_period);

        let momentum_window = closes.len().saturating_sub(3);
        let recent_closes = closes[momentum_window..].to_vec();

        let extras = IndicatorExtras {
            volume_ratio: volume_ratio(candles),
            ..IndicatorExtras::default()
        };

        Some(Self {
            symbol: symbol.to_string(),
            timestamp,
            price,
            ma,
            rsi,
            atr,
            recent_closes,
            extras,
        })
    }

    /// Close preceding the current price, for 1-candle momentum.
    pub fn prev_close(&self) -> Option<Decimal> {
        if self.recent_closes.len() >= 2 {
            self.recent_closes
                .get(self.recent_closes.len() - 2)
                .copied()
        } else {
            None
        }
    }
}

/// Simple moving average over the trailing `period` values.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let sum: Decimal = window.iter().copied().sum();
    Some(sum / Decimal::from(period as u64))
}

/// Classic RSI over the trailing `period` closes (simple mean of gains and
/// losses). 0 when every move is down, 100 when every move is up.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let window = &closes[closes.len() - period - 1..];
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > Decimal::ZERO {
            gains += change;
        } else {
            losses -= change;
        }
    }
    if losses == Decimal::ZERO {
        return Some(dec!(100));
    }
    let rs = gains / losses;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + rs))
}

/// Average true range over the trailing `period` candles. Falls back to 1%
/// of the last close when the series is too short, matching the behavior of
/// the control loop this feeds: it must always produce a usable number.
pub fn atr(candles: &[Candle], period: usize) -> Decimal {
    let fallback = candles
        .last()
        .map(|c| c.close * dec!(0.01))
        .unwrap_or(Decimal::ZERO);
    if period == 0 || candles.len() < period + 1 {
        return fallback;
    }

    let start = candles.len() - period;
    let mut sum = Decimal::ZERO;
    for i in start..candles.len() {
        let c = &candles[i];
        let prev_close = candles[i - 1].close;
        let tr = (c.high - c.low)
            .max((c.high - prev_close).abs())
            .max((c.low - prev_close).abs());
        sum += tr;
    }
    sum / Decimal::from(period as u64)
}

/// Last candle volume relative to the series average.
fn volume_ratio(candles: &[Candle]) -> Option<Decimal> {
    let last = candles.last()?.volume;
    let total: Decimal = candles.iter().map(|c| c.volume).sum();
    let avg = total / Decimal::from(candles.len() as u64);
    if avg == Decimal::ZERO {
        None
    } else {
        Some(last / avg)
    }
}
