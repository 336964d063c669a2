//! Interval-based triggers for the periodic reports.
//!
//! Triggers are measured from engine start rather than wall-clock
//! boundaries, so a restart never double-fires a report.

use crate::utils::Clock;
use std::sync::Arc;

pub struct ReportScheduler {
    clock: Arc<dyn Clock>,
    status_every_secs: i64,
    daily_every_secs: i64,
    last_status: i64,
    last_daily: i64,
}

impl ReportScheduler {
    pub fn new(clock: Arc<dyn Clock>, status_every_secs: i64, daily_every_secs: i64) -> Self {
        let now = clock.epoch_secs();
        Self {
            clock,
            status_every_secs,
            daily_every_secs,
            last_status: now,
            last_daily: now,
        }
    }

    /// True once per status interval; firing resets the window.
    pub fn status_due(&mut self) -> bool {
        let now = self.clock.epoch_secs();
        if now - self.last_status >= self.status_every_secs {
            self.last_status = now;
            true
        } else {
            false
        }
    }

    /// True once per daily-summary interval; firing resets the window.
    pub fn daily_due(&mut self) -> bool {
        let now = self.clock.epoch_secs();
        if now - self.last_daily >= self.daily_every_secs {
            self.last_daily = now;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    #[test]
    fn nothing_due_at_start() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut scheduler = ReportScheduler::new(clock, 21_600, 86_400);
        assert!(!scheduler.status_due());
        assert!(!scheduler.daily_due());
    }

    #[test]
    fn status_fires_once_per_interval() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut scheduler = ReportScheduler::new(clock.clone(), 21_600, 86_400);

        clock.advance_secs(21_600);
        assert!(scheduler.status_due());
        assert!(!scheduler.status_due());

        clock.advance_secs(21_599);
        assert!(!scheduler.status_due());
        clock.advance_secs(1);
        assert!(scheduler.status_due());
    }

    #[test]
    fn daily_is_independent_of_status() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut scheduler = ReportScheduler::new(clock.clone(), 21_600, 86_400);

        clock.advance_secs(86_400);
        assert!(scheduler.status_due());
        assert!(scheduler.daily_due());
        assert!(!scheduler.daily_due());
    }
}
