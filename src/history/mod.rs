//! Append-only trade history, one JSON file per calendar day.
//!
//! Every accepted intent (and every exposure cancellation) appends one
//! record to `<dir>/YYYY-MM-DD.json`. A missing or corrupt day file reads
//! as an empty collection; history must never take the trading loop down.

use crate::utils::Clock;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// One executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Epoch seconds.
    pub timestamp: i64,
    pub instrument: String,
    pub action: String,
    /// Position leg, absent when the action has no single leg (a
    /// cancellation of an order the cycle no longer sees, for example).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Day-file backed history store.
pub struct HistoryStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    pub fn new(dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create history dir {}", dir.display()))?;
        Ok(Self { dir, clock })
    }

    fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", day.format("%Y-%m-%d")))
    }

    /// Append a record to today's file.
    pub fn append(&self, record: HistoryRecord) -> Result<()> {
        let day = self.clock.now().date_naive();
        let path = self.day_path(day);

        let mut records = self.load_day(day);
        records.push(record);

        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write history file {}", path.display()))?;
        debug!(day = %day, count = records.len(), "history appended");
        Ok(())
    }

    /// Records for one day. Missing or unparseable files read as empty.
    pub fn load_day(&self, day: NaiveDate) -> Vec<HistoryRecord> {
        let path = self.day_path(day);
        let Ok(contents) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<HistoryRecord>>(&contents) {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "corrupt history file, treating as empty"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;
    use rust_decimal_macros::dec;

    fn record(action: &str) -> HistoryRecord {
        HistoryRecord {
            timestamp: 0,
            instrument: "ETHUSDT".into(),
            action: action.into(),
            side: Some("long".into()),
            price: dec!(3000),
            amount: dec!(0.03),
        }
    }

    #[test]
    fn append_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_epoch());
        let store = HistoryStore::new(tmp.path(), clock.clone()).unwrap();

        store.append(record("grid_add")).unwrap();
        store.append(record("rebalance_short")).unwrap();

        let day = clock.now().date_naive();
        let records = store.load_day(day);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "grid_add");
        assert_eq!(records[1].action, "rebalance_short");
    }

    #[test]
    fn records_group_by_day() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_epoch());
        let store = HistoryStore::new(tmp.path(), clock.clone()).unwrap();

        store.append(record("grid_add")).unwrap();
        let first_day = clock.now().date_naive();
        clock.advance_secs(86_400);
        store.append(record("exposure_trim")).unwrap();
        let second_day = clock.now().date_naive();

        assert_eq!(store.load_day(first_day).len(), 1);
        assert_eq!(store.load_day(second_day).len(), 1);
        assert_ne!(first_day, second_day);
    }

    #[test]
    fn sideless_record_omits_the_field() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_epoch());
        let store = HistoryStore::new(tmp.path(), clock.clone()).unwrap();

        let mut cancel = record("exposure_trim");
        cancel.side = None;
        store.append(cancel).unwrap();

        let day = clock.now().date_naive();
        let raw = fs::read_to_string(store.day_path(day)).unwrap();
        assert!(!raw.contains("side"));
        assert_eq!(store.load_day(day)[0].side, None);
    }

    #[test]
    fn missing_day_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_epoch());
        let store = HistoryStore::new(tmp.path(), clock).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(store.load_day(day).is_empty());
    }

    #[test]
    fn corrupt_day_file_reads_empty_and_recovers_on_append() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::at_epoch());
        let store = HistoryStore::new(tmp.path(), clock.clone()).unwrap();
        let day = clock.now().date_naive();

        fs::write(store.day_path(day), "{not json").unwrap();
        assert!(store.load_day(day).is_empty());

        store.append(record("grid_add")).unwrap();
        assert_eq!(store.load_day(day).len(), 1);
    }
}
