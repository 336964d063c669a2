//! One-sided position age tracking.
//!
//! A small owned store records when each (instrument, side) position first
//! became nonzero and forgets it when the side returns flat. The timeout
//! check itself is a pure predicate; acting on it (forced exit) belongs to
//! the host, not this monitor.

use crate::exchange::types::PositionSide;
use crate::utils::Clock;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Pure predicate: has a position opened at `opened_at` outlived
/// `timeout_secs` as of `now`?
pub fn timed_out(opened_at: DateTime<Utc>, now: DateTime<Utc>, timeout_secs: i64) -> bool {
    (now - opened_at).num_seconds() > timeout_secs
}

/// Tracks per-side position open timestamps across cycles.
pub struct PositionTimeoutMonitor {
    clock: Arc<dyn Clock>,
    timeout_secs: i64,
    opened_at: HashMap<(String, PositionSide), DateTime<Utc>>,
}

impl PositionTimeoutMonitor {
    pub fn new(clock: Arc<dyn Clock>, timeout_secs: i64) -> Self {
        Self {
            clock,
            timeout_secs,
            opened_at: HashMap::new(),
        }
    }

    /// Feed the cycle's observed position amount for one side. Sets the
    /// timestamp on the first nonzero observation, clears it when the side
    /// returns to zero, and leaves an already-set timestamp alone.
    pub fn observe(&mut self, symbol: &str, side: PositionSide, amount: Decimal) {
        let key = (symbol.to_string(), side);
        if amount == Decimal::ZERO {
            if self.opened_at.remove(&key).is_some() {
                debug!(symbol, side = %side, "position closed, timeout cleared");
            }
        } else {
            self.opened_at
                .entry(key)
                .or_insert_with(|| self.clock.now());
        }
    }

    /// True once the side's position has been open longer than the timeout.
    /// False when no open timestamp is recorded (flat side).
    pub fn check(&self, symbol: &str, side: PositionSide) -> bool {
        match self.opened_at.get(&(symbol.to_string(), side)) {
            Some(opened) => timed_out(*opened, self.clock.now(), self.timeout_secs),
            None => false,
        }
    }

    /// Recorded open time, if any.
    pub fn opened_at(&self, symbol: &str, side: PositionSide) -> Option<DateTime<Utc>> {
        self.opened_at.get(&(symbol.to_string(), side)).copied()
    }
}
