//! TTL memoization layer.
//!
//! Every external read the engine repeats inside a polling window goes
//! through one of these caches: a read within the entry's TTL returns the
//! stored payload, a read at or past the TTL recomputes and overwrites.
//! Construction takes a [`Clock`] so expiry is test-controllable.
//!
//! The stores are owned by the engine and mutated only from the single
//! decision thread; wrap them in a mutex if they ever cross threads.

use crate::utils::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct Entry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

/// Generic string-keyed cache with per-read TTL.
pub struct TtlCache<T: Clone> {
    name: &'static str,
    clock: Arc<dyn Clock>,
    entries: HashMap<String, Entry<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            clock,
            entries: HashMap::new(),
        }
    }

    /// Return the cached value if it is still inside `ttl_secs`, otherwise
    /// run `compute`, store the result with the current timestamp, and
    /// return it.
    pub fn get_or_compute(
        &mut self,
        key: &str,
        ttl_secs: i64,
        compute: impl FnOnce() -> T,
    ) -> T {
        if let Some(value) = self.fresh(key, ttl_secs) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Fallible variant: a failed compute leaves any stale entry untouched
    /// so the next read retries.
    pub fn get_or_try_compute(
        &mut self,
        key: &str,
        ttl_secs: i64,
        compute: impl FnOnce() -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        if let Some(value) = self.fresh(key, ttl_secs) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Cached value if present and younger than `ttl_secs`. Used directly by
    /// async callers that cannot pass a closure across an await point.
    pub fn fresh(&self, key: &str, ttl_secs: i64) -> Option<T> {
        let entry = self.entries.get(key)?;
        let age = (self.clock.now() - entry.stored_at).num_seconds();
        if age < ttl_secs {
            debug!(cache = self.name, key, age, "cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: &str, value: T) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: self.clock.now(),
            },
        );
    }

    /// Remove an entry if present; absent keys are not an error.
    pub fn invalidate(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!(cache = self.name, key, "cache invalidated");
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The named cache regions the engine carries across cycles.
pub struct CacheSet {
    /// Sized order amount per `{symbol}_amount` key.
    pub amount: TtlCache<rust_decimal::Decimal>,
    /// Exchange minimum order size per symbol (refreshed rarely).
    pub min_amount: TtlCache<rust_decimal::Decimal>,
}

impl CacheSet {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            amount: TtlCache::new("amount", clock.clone()),
            min_amount: TtlCache::new("min_amount", clock),
        }
    }

    /// Empty every region. Called once at process start so a restart never
    /// trades on state from a previous run.
    pub fn clear_all(&mut self) {
        self.amount.clear();
        self.min_amount.clear();
        tracing::info!("all caches cleared");
    }

    /// Drop the sized-amount key for one symbol after a confirmed order
    /// mutation, forcing a resize against fresh equity next cycle.
    pub fn invalidate_amount(&mut self, symbol: &str) {
        self.amount.invalidate(&format!("{symbol}_amount"));
    }
}
