//! The trading engine: per-instrument decision cycle, periodic reports and
//! the outer loop with shutdown and backoff handling.
//!
//! One cycle per instrument: market snapshot, grid spacing and sizing,
//! entry scoring, ladder planning, exposure enforcement, hedge rebalancing
//! and position-age checks. A failure in one instrument never stops the
//! others.

mod report;
mod scheduler;

pub use report::{daily_report, status_report, InstrumentStatus, InstrumentSummary};
pub use scheduler::ReportScheduler;

use crate::cache::CacheSet;
use crate::config::{Config, InstrumentConfig};
use crate::exchange::{Exchange, ExchangeError, OrderIntent, PositionSide};
use crate::history::{HistoryRecord, HistoryStore};
use crate::market::MarketSnapshot;
use crate::notify::{NotificationGate, Notifier};
use crate::risk::{ExposureGuard, HedgeRebalancer, PositionTimeoutMonitor};
use crate::strategy::{EntrySignalScorer, GridIntervalCalculator, GridPlanner, PositionSizer};
use crate::utils::Clock;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct Engine {
    config: Config,
    exchange: Arc<dyn Exchange>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    caches: CacheSet,
    gate: NotificationGate,
    history: HistoryStore,
    intervals: GridIntervalCalculator,
    sizer: PositionSizer,
    scorer: EntrySignalScorer,
    planner: GridPlanner,
    rebalancer: HedgeRebalancer,
    exposure: ExposureGuard,
    timeouts: PositionTimeoutMonitor,
    reports: ReportScheduler,
    statuses: HashMap<String, InstrumentStatus>,
    shutdown: Arc<AtomicBool>,
    /// Set when the venue rate-limits us; the outer loop extends its sleep.
    backoff_requested: bool,
}

impl Engine {
    pub fn new(
        config: Config,
        exchange: Arc<dyn Exchange>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let history = HistoryStore::new(&config.engine.history_dir, clock.clone())?;
        Ok(Self {
            caches: CacheSet::new(clock.clone()),
            gate: NotificationGate::new(clock.clone(), config.engine.notify_cooldown_secs),
            history,
            intervals: GridIntervalCalculator::new(config.interval_config()),
            sizer: PositionSizer::new(config.sizer_config()),
            scorer: EntrySignalScorer::new(config.signal_config()),
            planner: GridPlanner::new(config.planner_config()),
            rebalancer: HedgeRebalancer::new(config.hedge_config()),
            exposure: ExposureGuard::new(config.exposure_config()),
            timeouts: PositionTimeoutMonitor::new(clock.clone(), config.risk.position_timeout_secs),
            reports: ReportScheduler::new(
                clock.clone(),
                config.engine.status_report_secs,
                config.engine.pnl_report_secs,
            ),
            statuses: HashMap::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            backoff_requested: false,
            config,
            exchange,
            clock,
            notifier,
        })
    }

    /// Flag checked between cycles; set it from a signal handler to stop.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// One-time venue setup: fresh caches, hedge mode, per-instrument
    /// leverage.
    pub async fn startup(&mut self) -> Result<()> {
        self.caches.clear_all();
        self.exchange
            .enable_hedge_mode()
            .await
            .context("enabling hedge mode")?;
        for instrument in &self.config.instruments {
            self.exchange
                .set_leverage(&instrument.symbol, instrument.leverage)
                .await
                .with_context(|| format!("setting leverage for {}", instrument.symbol))?;
            info!(
                symbol = %instrument.symbol,
                leverage = instrument.leverage,
                "instrument configured"
            );
        }
        Ok(())
    }

    /// Main trading loop. Runs until the shutdown flag is set.
    pub async fn run(&mut self) -> Result<()> {
        self.startup().await?;
        info!(instruments = self.config.instruments.len(), "engine started");

        while !self.shutdown.load(Ordering::SeqCst) {
            let mut cycle_failed = false;
            for instrument in self.config.instruments.clone() {
                if self.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = self.process_instrument(&instrument).await {
                    error!(symbol = %instrument.symbol, error = %e, "cycle failed");
                    if self.gate.may_send(&instrument.symbol, "cycle_error", None) {
                        self.notifier
                            .send(&format!("⚠️ {} cycle failed: {e:#}", instrument.symbol))
                            .await;
                    }
                    cycle_failed = true;
                }
                // brief pause between instruments to spread venue reads
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            self.run_reports().await;

            let sleep_secs = if cycle_failed || self.backoff_requested {
                self.config.engine.backoff_secs
            } else {
                self.config.engine.cycle_secs
            };
            self.backoff_requested = false;
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
        }

        info!("engine stopped");
        Ok(())
    }

    /// One decision cycle for one instrument.
    async fn process_instrument(&mut self, instrument: &InstrumentConfig) -> Result<()> {
        let symbol = instrument.symbol.as_str();
        let ttl = self.config.engine.cache_ttl_secs;

        let candles = self
            .exchange
            .fetch_market(symbol, &instrument.timeframe, instrument.lookback)
            .await
            .context("fetching candles")?;
        let Some(last) = candles.last() else {
            warn!(symbol, "no market data");
            return Ok(());
        };
        let price = last.close;
        if price <= Decimal::ZERO {
            warn!(symbol, %price, "invalid price");
            return Ok(());
        }

        let Some(snapshot) = MarketSnapshot::from_candles(
            symbol,
            self.clock.now(),
            price,
            &candles,
            instrument.ma_period,
            instrument.rsi_period,
            instrument.atr_period,
        ) else {
            warn!(symbol, candles = candles.len(), "insufficient market data");
            return Ok(());
        };

        let account = self
            .exchange
            .fetch_account_state()
            .await
            .context("fetching account state")?;
        let long_amount = account.position_amount(symbol, PositionSide::Long);
        let short_amount = account.position_amount(symbol, PositionSide::Short);
        let long_value = account.position_value(symbol, PositionSide::Long);
        let short_value = account.position_value(symbol, PositionSide::Short);
        let open_orders = account.open_orders_for(symbol);

        info!(
            symbol,
            %price,
            ma = %snapshot.ma,
            rsi = %snapshot.rsi,
            long = %long_amount,
            short = %short_amount,
            orders = open_orders.len(),
            "cycle snapshot"
        );

        // position age
        self.timeouts.observe(symbol, PositionSide::Long, long_amount);
        self.timeouts
            .observe(symbol, PositionSide::Short, short_amount);
        for side in [PositionSide::Long, PositionSide::Short] {
            if self.timeouts.check(symbol, side) {
                warn!(symbol, %side, "position open past timeout");
                if self.gate.may_send(symbol, "position_timeout", None) {
                    self.notifier
                        .send(&format!(
                            "⏰ {symbol} {side} position open past {}s",
                            self.config.risk.position_timeout_secs
                        ))
                        .await;
                }
            }
        }

        // grid spacing and sizing
        let interval = self
            .intervals
            .compute_interval(price, snapshot.atr, &open_orders);
        let equity = account.total_balance;
        let sizer = &self.sizer;
        let amount = self
            .caches
            .amount
            .get_or_compute(&format!("{symbol}_amount"), ttl, || {
                sizer.compute_amount(equity, price, instrument.size_fraction, instrument.leverage)
            });

        let signal = self.scorer.score(&snapshot);
        debug!(
            symbol,
            score = signal.score,
            max = signal.max_score,
            long = signal.long,
            short = signal.short,
            "entry signal"
        );

        // ladder maintenance
        let intents = self
            .planner
            .plan(&snapshot, interval, amount, &signal, &open_orders);
        for intent in &intents {
            self.submit_intent(intent).await;
            if self.backoff_requested {
                return Ok(());
            }
        }

        // exposure cap
        let cancels = self
            .exposure
            .enforce(equity, long_value, short_value, price, &open_orders);
        for cancel in cancels {
            match self
                .exchange
                .cancel_order(&cancel.order_id, &cancel.symbol)
                .await
            {
                Ok(()) => {
                    let order = open_orders.iter().find(|o| o.id == cancel.order_id);
                    let record = HistoryRecord {
                        timestamp: self.clock.epoch_secs(),
                        instrument: cancel.symbol.clone(),
                        action: cancel.reason.to_string(),
                        side: order.map(|o| o.position_side.key().to_string()),
                        price: order.map(|o| o.price).unwrap_or_default(),
                        amount: order.map(|o| o.amount).unwrap_or_default(),
                    };
                    if let Err(e) = self.history.append(record) {
                        warn!(error = %e, "history append failed");
                    }
                    info!(symbol, order_id = %cancel.order_id, "order cancelled for exposure");
                    if self.gate.may_send(symbol, cancel.reason, None) {
                        self.notifier
                            .send(&format!("✂️ {symbol} exposure cap hit, trimming orders"))
                            .await;
                    }
                }
                Err(e) => warn!(symbol, order_id = %cancel.order_id, error = %e, "cancel failed"),
            }
        }

        // hedge-leg balance
        let min_key = format!("{symbol}_min_amount");
        let min_amount = match self
            .caches
            .min_amount
            .fresh(&min_key, self.config.engine.min_amount_ttl_secs)
        {
            Some(v) => v,
            None => {
                let v = self
                    .exchange
                    .min_order_amount(symbol)
                    .await
                    .context("fetching minimum order amount")?;
                self.caches.min_amount.insert(&min_key, v);
                v
            }
        };
        if let Some(intent) = self.rebalancer.rebalance(
            symbol,
            long_value,
            short_value,
            &snapshot.recent_closes,
            price,
            min_amount,
        ) {
            self.submit_intent(&intent).await;
        }

        self.statuses.insert(
            symbol.to_string(),
            InstrumentStatus {
                symbol: symbol.to_string(),
                price,
                long_value,
                short_value,
                open_orders: open_orders.len(),
            },
        );
        Ok(())
    }

    /// Push one intent through the boundary. Rejections are classified:
    /// invalid and underfunded orders are dropped, rate limiting requests a
    /// backoff, anything else is logged and alerted.
    async fn submit_intent(&mut self, intent: &OrderIntent) {
        match self.exchange.submit_order(intent).await {
            Ok(ack) => {
                info!(
                    symbol = %intent.symbol,
                    action = %intent.action,
                    side = %intent.side,
                    price = %intent.price,
                    amount = %intent.amount,
                    order_id = %ack.order_id,
                    reduce_only = ack.reduce_only,
                    "order accepted"
                );
                self.caches.invalidate_amount(&intent.symbol);
                let record = HistoryRecord {
                    timestamp: self.clock.epoch_secs(),
                    instrument: intent.symbol.clone(),
                    action: intent.action.as_str().to_string(),
                    side: Some(intent.position_side.key().to_string()),
                    price: intent.price,
                    amount: intent.amount,
                };
                if let Err(e) = self.history.append(record) {
                    warn!(error = %e, "history append failed");
                }
                if self.gate.may_send(&intent.symbol, intent.event_type(), None) {
                    self.notifier
                        .send(&format!(
                            "{} {} {} {} @ ${}",
                            intent.symbol, intent.action, intent.side, intent.amount, intent.price
                        ))
                        .await;
                }
            }
            Err(ExchangeError::RateLimited) => {
                warn!(symbol = %intent.symbol, "rate limited, backing off");
                self.backoff_requested = true;
            }
            Err(e @ (ExchangeError::InvalidOrder(_) | ExchangeError::InsufficientFunds(_))) => {
                warn!(
                    symbol = %intent.symbol,
                    kind = e.kind(),
                    error = %e,
                    "order dropped"
                );
                if self.gate.may_send(&intent.symbol, e.kind(), None) {
                    self.notifier
                        .send(&format!("⚠️ {} order rejected: {e}", intent.symbol))
                        .await;
                }
            }
            Err(e) => {
                error!(symbol = %intent.symbol, error = %e, "order submission failed");
                if self.gate.may_send(&intent.symbol, e.kind(), None) {
                    self.notifier
                        .send(&format!("⚠️ {} order failed: {e}", intent.symbol))
                        .await;
                }
            }
        }
    }

    async fn run_reports(&mut self) {
        if self.reports.status_due() {
            let entries: Vec<InstrumentStatus> = self
                .config
                .instruments
                .iter()
                .filter_map(|i| self.statuses.get(&i.symbol).cloned())
                .collect();
            if !entries.is_empty() {
                self.notifier.send(&status_report(&entries)).await;
                info!("status report sent");
            }
        }

        if self.reports.daily_due() {
            let today = self.clock.now().date_naive();
            let day_records = self.history.load_day(today);
            let entries: Vec<InstrumentSummary> = self
                .config
                .instruments
                .iter()
                .map(|i| InstrumentSummary {
                    symbol: i.symbol.clone(),
                    net_value: self
                        .statuses
                        .get(&i.symbol)
                        .map(|s| s.long_value + s.short_value)
                        .unwrap_or_default(),
                    trades_today: day_records
                        .iter()
                        .filter(|r| r.instrument == i.symbol)
                        .count(),
                })
                .collect();
            self.notifier.send(&daily_report(&entries)).await;
            info!("daily report sent");
        }
    }
}
