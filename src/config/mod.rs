//! Configuration for the grid engine.
//!
//! Loads settings from a `config` file and `GP_`-prefixed environment
//! variables. Section structs re-declare the tunables with serde defaults;
//! conversion methods hand the strategy and risk components their own
//! config types.

use crate::risk::{ExposureConfig, HedgeConfig};
use crate::strategy::{IntervalConfig, PlannerConfig, SignalConfig, SizerConfig};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Binance API credentials and formatting
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Telegram alerting
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Trading loop cadence, caches and reporting
    #[serde(default)]
    pub engine: EngineConfig,
    /// Grid geometry and sizing
    #[serde(default)]
    pub grid: GridConfig,
    /// Entry confirmation scoring thresholds
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Hedge-leg rebalancing parameters
    #[serde(default)]
    pub hedging: HedgingConfig,
    /// Exposure cap and position timeout
    #[serde(default)]
    pub risk: RiskConfig,
    /// Instruments to trade
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default = "default_true")]
    pub testnet: bool,
    /// Decimal places for limit prices
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,
    /// Decimal places for order quantities
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between trading cycles
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
    /// Backoff after a failed cycle or a rate-limit rejection
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    /// Account/market cache TTL
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
    /// Venue minimum-amount cache TTL (changes rarely)
    #[serde(default = "default_min_amount_ttl_secs")]
    pub min_amount_ttl_secs: i64,
    /// Per-(instrument, event) notification cooldown
    #[serde(default = "default_notify_cooldown_secs")]
    pub notify_cooldown_secs: i64,
    /// Seconds between status reports
    #[serde(default = "default_status_report_secs")]
    pub status_report_secs: i64,
    /// Seconds between daily summary reports
    #[serde(default = "default_pnl_report_secs")]
    pub pnl_report_secs: i64,
    /// Trade history directory
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
    /// Log directory for the rolling file appender
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_interval_min")]
    pub interval_min: Decimal,
    #[serde(default = "default_interval_max")]
    pub interval_max: Decimal,
    #[serde(default = "default_interval_floor")]
    pub interval_floor: Decimal,
    #[serde(default = "default_interval_fallback")]
    pub interval_fallback: Decimal,
    /// ATR/price ratio mapped to the tightest spacing
    #[serde(default = "default_atr_band_low")]
    pub atr_band_low: Decimal,
    /// ATR/price ratio mapped to the widest spacing
    #[serde(default = "default_atr_band_high")]
    pub atr_band_high: Decimal,
    /// Ladder levels per side
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Minimum fractional distance to an existing same-side order
    #[serde(default = "default_min_level_distance")]
    pub min_level_distance: Decimal,
    /// Fixed per-order notional floor in quote currency
    #[serde(default = "default_min_notional_floor")]
    pub min_notional_floor: Decimal,
    /// Dynamic floor factor: price * factor * leverage
    #[serde(default = "default_dynamic_min_factor")]
    pub dynamic_min_factor: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_rsi_long")]
    pub rsi_long_threshold: Decimal,
    #[serde(default = "default_rsi_short")]
    pub rsi_short_threshold: Decimal,
    #[serde(default = "default_adx_threshold")]
    pub adx_threshold: Decimal,
    #[serde(default = "default_cci_threshold")]
    pub cci_threshold: Decimal,
    #[serde(default = "default_mfi_threshold")]
    pub mfi_threshold: Decimal,
    #[serde(default = "default_stoch_threshold")]
    pub stoch_k_threshold: Decimal,
    #[serde(default = "default_stoch_threshold")]
    pub stoch_d_threshold: Decimal,
    #[serde(default = "default_bb_expansion")]
    pub bb_expansion_threshold: Decimal,
    #[serde(default = "default_volume_spike")]
    pub volume_spike_threshold: Decimal,
    /// Minimum confirming points before the grid may add orders
    #[serde(default = "default_score_threshold")]
    pub score_threshold: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgingConfig {
    /// Value-ratio deviation from target that triggers a correction
    #[serde(default = "default_rebalance_threshold")]
    pub rebalance_threshold: Decimal,
    /// Minimum one-candle momentum for the target to leave 50/50
    #[serde(default = "default_min_momentum")]
    pub min_momentum: Decimal,
    /// Momentum multiplier applied to the target shift
    #[serde(default = "default_momentum_tilt")]
    pub momentum_tilt: Decimal,
    #[serde(default = "default_ratio_floor")]
    pub ratio_floor: Decimal,
    #[serde(default = "default_ratio_ceiling")]
    pub ratio_ceiling: Decimal,
    /// Combined notional below this is left alone
    #[serde(default = "default_min_total_value")]
    pub min_total_value: Decimal,
    /// Fraction of the imbalance corrected per cycle
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: Decimal,
    /// Correction cap as a fraction of combined notional
    #[serde(default = "default_adjustment_cap")]
    pub adjustment_cap: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum combined notional as a multiple of equity
    #[serde(default = "default_max_exposure")]
    pub max_exposure: Decimal,
    /// Resting-order cancellations allowed per cycle
    #[serde(default = "default_max_cancels")]
    pub max_cancels_per_cycle: usize,
    /// Seconds a one-sided position may stay open before alerting
    #[serde(default = "default_position_timeout_secs")]
    pub position_timeout_secs: i64,
}

/// One tradeable perpetual contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// Relative capital weight across instruments
    #[serde(default = "default_weight")]
    pub weight: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Fraction of equity per grid order
    #[serde(default = "default_size_fraction")]
    pub size_fraction: Decimal,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Candles fetched per cycle
    #[serde(default = "default_lookback")]
    pub lookback: u32,
    #[serde(default = "default_ma_period")]
    pub ma_period: usize,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_price_decimals() -> u32 {
    2
}

fn default_amount_decimals() -> u32 {
    3
}

fn default_cycle_secs() -> u64 {
    5
}

fn default_backoff_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> i64 {
    15
}

fn default_min_amount_ttl_secs() -> i64 {
    3600
}

fn default_notify_cooldown_secs() -> i64 {
    300 // 5 minutes
}

fn default_status_report_secs() -> i64 {
    21_600 // 6 hours
}

fn default_pnl_report_secs() -> i64 {
    86_400 // 24 hours
}

fn default_history_dir() -> String {
    "history".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_interval_min() -> Decimal {
    Decimal::new(12, 4) // 0.0012
}

fn default_interval_max() -> Decimal {
    Decimal::new(20, 4) // 0.0020
}

fn default_interval_floor() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}

fn default_interval_fallback() -> Decimal {
    Decimal::new(12, 4) // 0.0012
}

fn default_atr_band_low() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_atr_band_high() -> Decimal {
    Decimal::new(3, 2) // 0.03
}

fn default_max_steps() -> usize {
    6
}

fn default_min_level_distance() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}

fn default_min_notional_floor() -> Decimal {
    Decimal::new(25, 0) // 25 USDT
}

fn default_dynamic_min_factor() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_rsi_long() -> Decimal {
    Decimal::new(35, 0)
}

fn default_rsi_short() -> Decimal {
    Decimal::new(65, 0)
}

fn default_adx_threshold() -> Decimal {
    Decimal::new(25, 0)
}

fn default_cci_threshold() -> Decimal {
    Decimal::new(100, 0)
}

fn default_mfi_threshold() -> Decimal {
    Decimal::new(20, 0)
}

fn default_stoch_threshold() -> Decimal {
    Decimal::new(20, 0)
}

fn default_bb_expansion() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_volume_spike() -> Decimal {
    Decimal::new(20, 1) // 2.0
}

fn default_score_threshold() -> u8 {
    4
}

fn default_rebalance_threshold() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

fn default_min_momentum() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_momentum_tilt() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

fn default_ratio_floor() -> Decimal {
    Decimal::new(30, 2) // 0.30
}

fn default_ratio_ceiling() -> Decimal {
    Decimal::new(70, 2) // 0.70
}

fn default_min_total_value() -> Decimal {
    Decimal::new(10, 0) // 10 USDT
}

fn default_adjustment_factor() -> Decimal {
    Decimal::new(30, 2) // 0.30
}

fn default_adjustment_cap() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_max_exposure() -> Decimal {
    Decimal::new(30, 1) // 3.0x equity
}

fn default_max_cancels() -> usize {
    2
}

fn default_position_timeout_secs() -> i64 {
    1800 // 30 minutes
}

fn default_weight() -> Decimal {
    Decimal::ONE
}

fn default_leverage() -> u32 {
    5
}

fn default_size_fraction() -> Decimal {
    Decimal::new(1, 2) // 0.01 of equity
}

fn default_timeframe() -> String {
    "1m".to_string()
}

fn default_lookback() -> u32 {
    100
}

fn default_ma_period() -> usize {
    20
}

fn default_rsi_period() -> usize {
    14
}

fn default_atr_period() -> usize {
    14
}

fn default_instruments() -> Vec<InstrumentConfig> {
    vec![InstrumentConfig {
        symbol: "ETHUSDT".to_string(),
        weight: default_weight(),
        leverage: default_leverage(),
        size_fraction: default_size_fraction(),
        timeframe: default_timeframe(),
        lookback: default_lookback(),
        ma_period: default_ma_period(),
        rsi_period: default_rsi_period(),
        atr_period: default_atr_period(),
    }]
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("GP"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.grid.interval_min > Decimal::ZERO
                && self.grid.interval_min <= self.grid.interval_max,
            "interval_min must be positive and <= interval_max"
        );
        anyhow::ensure!(
            self.grid.atr_band_low < self.grid.atr_band_high,
            "atr_band_low must be < atr_band_high"
        );
        anyhow::ensure!(
            self.hedging.ratio_floor < self.hedging.ratio_ceiling,
            "ratio_floor must be < ratio_ceiling"
        );
        anyhow::ensure!(
            self.risk.max_exposure > Decimal::ZERO,
            "max_exposure must be positive"
        );
        anyhow::ensure!(!self.instruments.is_empty(), "no instruments configured");
        for instrument in &self.instruments {
            anyhow::ensure!(
                instrument.weight > Decimal::ZERO,
                "weight must be positive for {}",
                instrument.symbol
            );
            anyhow::ensure!(
                instrument.leverage >= 1,
                "leverage must be >= 1 for {}",
                instrument.symbol
            );
            anyhow::ensure!(
                instrument.size_fraction > Decimal::ZERO
                    && instrument.size_fraction <= Decimal::ONE,
                "size_fraction must be in (0, 1] for {}",
                instrument.symbol
            );
        }
        Ok(())
    }

    pub fn interval_config(&self) -> IntervalConfig {
        IntervalConfig {
            min: self.grid.interval_min,
            max: self.grid.interval_max,
            absolute_floor: self.grid.interval_floor,
            fallback: self.grid.interval_fallback,
            band_low: self.grid.atr_band_low,
            band_high: self.grid.atr_band_high,
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_steps: self.grid.max_steps,
            min_level_distance: self.grid.min_level_distance,
        }
    }

    pub fn sizer_config(&self) -> SizerConfig {
        SizerConfig {
            min_notional_floor: self.grid.min_notional_floor,
            dynamic_min_factor: self.grid.dynamic_min_factor,
        }
    }

    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            rsi_long_threshold: self.scoring.rsi_long_threshold,
            rsi_short_threshold: self.scoring.rsi_short_threshold,
            adx_threshold: self.scoring.adx_threshold,
            cci_threshold: self.scoring.cci_threshold,
            mfi_threshold: self.scoring.mfi_threshold,
            stoch_k_threshold: self.scoring.stoch_k_threshold,
            stoch_d_threshold: self.scoring.stoch_d_threshold,
            bb_expansion_threshold: self.scoring.bb_expansion_threshold,
            volume_spike_threshold: self.scoring.volume_spike_threshold,
            score_threshold: self.scoring.score_threshold,
        }
    }

    pub fn hedge_config(&self) -> HedgeConfig {
        HedgeConfig {
            rebalance_threshold: self.hedging.rebalance_threshold,
            min_momentum: self.hedging.min_momentum,
            momentum_tilt: self.hedging.momentum_tilt,
            ratio_floor: self.hedging.ratio_floor,
            ratio_ceiling: self.hedging.ratio_ceiling,
            min_total_value: self.hedging.min_total_value,
            adjustment_factor: self.hedging.adjustment_factor,
            adjustment_cap: self.hedging.adjustment_cap,
        }
    }

    pub fn exposure_config(&self) -> ExposureConfig {
        ExposureConfig {
            max_exposure: self.risk.max_exposure,
            max_cancels_per_cycle: self.risk.max_cancels_per_cycle,
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            testnet: true,
            price_decimals: default_price_decimals(),
            amount_decimals: default_amount_decimals(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_secs: default_cycle_secs(),
            backoff_secs: default_backoff_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_amount_ttl_secs: default_min_amount_ttl_secs(),
            notify_cooldown_secs: default_notify_cooldown_secs(),
            status_report_secs: default_status_report_secs(),
            pnl_report_secs: default_pnl_report_secs(),
            history_dir: default_history_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            interval_min: default_interval_min(),
            interval_max: default_interval_max(),
            interval_floor: default_interval_floor(),
            interval_fallback: default_interval_fallback(),
            atr_band_low: default_atr_band_low(),
            atr_band_high: default_atr_band_high(),
            max_steps: default_max_steps(),
            min_level_distance: default_min_level_distance(),
            min_notional_floor: default_min_notional_floor(),
            dynamic_min_factor: default_dynamic_min_factor(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rsi_long_threshold: default_rsi_long(),
            rsi_short_threshold: default_rsi_short(),
            adx_threshold: default_adx_threshold(),
            cci_threshold: default_cci_threshold(),
            mfi_threshold: default_mfi_threshold(),
            stoch_k_threshold: default_stoch_threshold(),
            stoch_d_threshold: default_stoch_threshold(),
            bb_expansion_threshold: default_bb_expansion(),
            volume_spike_threshold: default_volume_spike(),
            score_threshold: default_score_threshold(),
        }
    }
}

impl Default for HedgingConfig {
    fn default() -> Self {
        Self {
            rebalance_threshold: default_rebalance_threshold(),
            min_momentum: default_min_momentum(),
            momentum_tilt: default_momentum_tilt(),
            ratio_floor: default_ratio_floor(),
            ratio_ceiling: default_ratio_ceiling(),
            min_total_value: default_min_total_value(),
            adjustment_factor: default_adjustment_factor(),
            adjustment_cap: default_adjustment_cap(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_exposure: default_max_exposure(),
            max_cancels_per_cycle: default_max_cancels(),
            position_timeout_secs: default_position_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_validate() {
        let config = Config {
            instruments: default_instruments(),
            ..Config::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn default_instrument_is_eth() {
        let instruments = default_instruments();
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].symbol, "ETHUSDT");
        assert_eq!(instruments[0].weight, Decimal::ONE);
        assert_eq!(instruments[0].leverage, 5);
        assert_eq!(instruments[0].size_fraction, dec!(0.01));
    }

    #[test]
    fn zero_weight_rejected() {
        let mut config = Config {
            instruments: default_instruments(),
            ..Config::default()
        };
        config.instruments[0].weight = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn component_config_conversion() {
        let config = Config::default();
        assert_eq!(config.interval_config().min, dec!(0.0012));
        assert_eq!(config.interval_config().max, dec!(0.0020));
        assert_eq!(config.sizer_config().min_notional_floor, dec!(25));
        assert_eq!(config.signal_config().score_threshold, 4);
        assert_eq!(config.hedge_config().rebalance_threshold, dec!(0.15));
        assert_eq!(config.exposure_config().max_exposure, dec!(3.0));
    }

    #[test]
    fn invalid_interval_bounds_rejected() {
        let mut config = Config {
            instruments: default_instruments(),
            ..Config::default()
        };
        config.grid.interval_min = dec!(0.005);
        assert!(config.validate().is_err());
    }
}
