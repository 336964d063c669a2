//! Entry signal scoring.
//!
//! A table of indicator rules, each worth one point, scored against the
//! cycle's market snapshot. Direction comes from the trend rule alone
//! (price vs moving average); the score only decides whether that bias is
//! confirmed strongly enough to tilt grid placement. New indicators are new
//! table entries, not new scorer code.

use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Directional bias under evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Long,
    Short,
}

/// Thresholds consumed by the default rule table.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub rsi_long_threshold: Decimal,
    pub rsi_short_threshold: Decimal,
    pub adx_threshold: Decimal,
    pub cci_threshold: Decimal,
    pub mfi_threshold: Decimal,
    pub stoch_k_threshold: Decimal,
    pub stoch_d_threshold: Decimal,
    pub bb_expansion_threshold: Decimal,
    pub volume_spike_threshold: Decimal,
    /// Minimum points for the bias to be confirmed.
    pub score_threshold: u8,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_long_threshold: dec!(35),
            rsi_short_threshold: dec!(65),
            adx_threshold: dec!(25),
            cci_threshold: dec!(100),
            mfi_threshold: dec!(20),
            stoch_k_threshold: dec!(20),
            stoch_d_threshold: dec!(20),
            bb_expansion_threshold: dec!(1.5),
            volume_spike_threshold: dec!(2.0),
            score_threshold: 4,
        }
    }
}

/// One indicator condition. Returns `None` when the indicator is not
/// available in the snapshot (contributes no point either way).
pub struct SignalRule {
    pub name: &'static str,
    pub check: fn(&MarketSnapshot, &SignalConfig, Bias) -> Option<bool>,
}

/// Scoring outcome for one snapshot.
#[derive(Debug, Clone)]
pub struct EntrySignal {
    pub long: bool,
    pub short: bool,
    pub score: u8,
    pub max_score: u8,
    /// Per-rule outcomes, in table order; unavailable indicators read false.
    pub conditions: Vec<(&'static str, bool)>,
}

impl EntrySignal {
    /// An unconfirmed, directionless signal (grid stays symmetric).
    pub fn neutral(max_score: u8) -> Self {
        Self {
            long: false,
            short: false,
            score: 0,
            max_score,
            conditions: Vec::new(),
        }
    }

    pub fn confirmed(&self) -> bool {
        self.long || self.short
    }
}

fn trend_alignment(s: &MarketSnapshot, _c: &SignalConfig, bias: Bias) -> Option<bool> {
    Some(match bias {
        Bias::Long => s.price > s.ma,
        Bias::Short => s.price < s.ma,
    })
}

fn rsi_extreme(s: &MarketSnapshot, c: &SignalConfig, bias: Bias) -> Option<bool> {
    Some(match bias {
        Bias::Long => s.rsi < c.rsi_long_threshold,
        Bias::Short => s.rsi > c.rsi_short_threshold,
    })
}

fn adx_strength(s: &MarketSnapshot, c: &SignalConfig, _bias: Bias) -> Option<bool> {
    s.extras.adx.map(|adx| adx > c.adx_threshold)
}

fn cci_extreme(s: &MarketSnapshot, c: &SignalConfig, bias: Bias) -> Option<bool> {
    s.extras.cci.map(|cci| match bias {
        Bias::Long => cci < -c.cci_threshold,
        Bias::Short => cci > c.cci_threshold,
    })
}

fn mfi_extreme(s: &MarketSnapshot, c: &SignalConfig, bias: Bias) -> Option<bool> {
    s.extras.mfi.map(|mfi| match bias {
        Bias::Long => mfi < c.mfi_threshold,
        Bias::Short => mfi > dec!(100) - c.mfi_threshold,
    })
}

fn stoch_k_extreme(s: &MarketSnapshot, c: &SignalConfig, bias: Bias) -> Option<bool> {
    s.extras.stoch_k.map(|k| match bias {
        Bias::Long => k < c.stoch_k_threshold,
        Bias::Short => k > dec!(100) - c.stoch_k_threshold,
    })
}

fn stoch_d_extreme(s: &MarketSnapshot, c: &SignalConfig, bias: Bias) -> Option<bool> {
    s.extras.stoch_d.map(|d| match bias {
        Bias::Long => d < c.stoch_d_threshold,
        Bias::Short => d > dec!(100) - c.stoch_d_threshold,
    })
}

fn bollinger_expansion(s: &MarketSnapshot, c: &SignalConfig, _bias: Bias) -> Option<bool> {
    s.extras
        .bb_expansion
        .map(|width| width > c.bb_expansion_threshold)
}

fn volume_spike(s: &MarketSnapshot, c: &SignalConfig, _bias: Bias) -> Option<bool> {
    s.extras
        .volume_ratio
        .map(|ratio| ratio > c.volume_spike_threshold)
}

fn higher_tf_confirmation(s: &MarketSnapshot, _c: &SignalConfig, bias: Bias) -> Option<bool> {
    s.extras.higher_tf_trend_up.map(|up| match bias {
        Bias::Long => up,
        Bias::Short => !up,
    })
}

/// The default 10-point rule table.
pub fn default_rules() -> Vec<SignalRule> {
    vec![
        SignalRule { name: "trend_alignment", check: trend_alignment },
        SignalRule { name: "rsi_extreme", check: rsi_extreme },
        SignalRule { name: "adx_strength", check: adx_strength },
        SignalRule { name: "cci_extreme", check: cci_extreme },
        SignalRule { name: "mfi_extreme", check: mfi_extreme },
        SignalRule { name: "stoch_k_extreme", check: stoch_k_extreme },
        SignalRule { name: "stoch_d_extreme", check: stoch_d_extreme },
        SignalRule { name: "bollinger_expansion", check: bollinger_expansion },
        SignalRule { name: "volume_spike", check: volume_spike },
        SignalRule { name: "higher_tf_confirmation", check: higher_tf_confirmation },
    ]
}

/// Scores a snapshot against the rule table.
pub struct EntrySignalScorer {
    config: SignalConfig,
    rules: Vec<SignalRule>,
}

impl EntrySignalScorer {
    pub fn new(config: SignalConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    /// Custom table, e.g. a trimmed-down set in tests or a host adding its
    /// own indicator.
    pub fn with_rules(config: SignalConfig, rules: Vec<SignalRule>) -> Self {
        Self { config, rules }
    }

    pub fn score(&self, snapshot: &MarketSnapshot) -> EntrySignal {
        let bias = if snapshot.price > snapshot.ma {
            Bias::Long
        } else {
            Bias::Short
        };

        let mut score = 0u8;
        let mut conditions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let hit = (rule.check)(snapshot, &self.config, bias).unwrap_or(false);
            if hit {
                score += 1;
            }
            conditions.push((rule.name, hit));
        }

        let max_score = self.rules.len() as u8;
        let confirmed = score >= self.config.score_threshold;
        EntrySignal {
            long: confirmed && bias == Bias::Long,
            short: confirmed && bias == Bias::Short,
            score,
            max_score,
            conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::IndicatorExtras;
    use chrono::Utc;

    fn snapshot(price: Decimal, ma: Decimal, rsi: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETHUSDT".into(),
            timestamp: Utc::now(),
            price,
            ma,
            rsi,
            atr: dec!(30),
            recent_closes: vec![price, price],
            extras: IndicatorExtras::default(),
        }
    }

    #[test]
    fn below_threshold_stays_symmetric() {
        // price above MA but RSI neutral and no extras: 1 of 10 points
        let scorer = EntrySignalScorer::new(SignalConfig::default());
        let signal = scorer.score(&snapshot(dec!(3010), dec!(3000), dec!(50)));
        assert_eq!(signal.score, 1);
        assert!(!signal.confirmed());
        assert!(!signal.long && !signal.short);
    }

    #[test]
    fn confirmed_long_bias() {
        let mut snap = snapshot(dec!(3010), dec!(3000), dec!(30));
        snap.extras = IndicatorExtras {
            adx: Some(dec!(30)),
            cci: Some(dec!(-150)),
            higher_tf_trend_up: Some(true),
            ..IndicatorExtras::default()
        };
        let scorer = EntrySignalScorer::new(SignalConfig::default());
        let signal = scorer.score(&snap);
        // trend + rsi + adx + cci + higher_tf = 5 points
        assert_eq!(signal.score, 5);
        assert!(signal.long);
        assert!(!signal.short);
    }

    #[test]
    fn confirmed_short_bias() {
        let mut snap = snapshot(dec!(2990), dec!(3000), dec!(75));
        snap.extras = IndicatorExtras {
            adx: Some(dec!(30)),
            mfi: Some(dec!(90)),
            ..IndicatorExtras::default()
        };
        let scorer = EntrySignalScorer::new(SignalConfig::default());
        let signal = scorer.score(&snap);
        assert_eq!(signal.score, 4);
        assert!(signal.short);
        assert!(!signal.long);
    }

    #[test]
    fn max_score_tracks_table_size() {
        let scorer = EntrySignalScorer::new(SignalConfig::default());
        let signal = scorer.score(&snapshot(dec!(3010), dec!(3000), dec!(50)));
        assert_eq!(signal.max_score, 10);
        assert_eq!(signal.conditions.len(), 10);

        // a trimmed table shrinks max_score without touching the loop
        let rules = vec![SignalRule { name: "trend_alignment", check: trend_alignment }];
        let scorer = EntrySignalScorer::with_rules(
            SignalConfig {
                score_threshold: 1,
                ..SignalConfig::default()
            },
            rules,
        );
        let signal = scorer.score(&snapshot(dec!(3010), dec!(3000), dec!(50)));
        assert_eq!(signal.max_score, 1);
        assert!(signal.long);
    }

    #[test]
    fn unavailable_indicators_never_score() {
        // all extras None: only trend/rsi rules can fire
        let scorer = EntrySignalScorer::new(SignalConfig::default());
        let signal = scorer.score(&snapshot(dec!(3010), dec!(3000), dec!(20)));
        assert_eq!(signal.score, 2);
        let fired: Vec<_> = signal
            .conditions
            .iter()
            .filter(|(_, hit)| *hit)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(fired, vec!["trend_alignment", "rsi_extreme"]);
    }
}
