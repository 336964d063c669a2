//! Outbound alerting: the per-event cooldown gate and the delivery boundary.
//!
//! The gate decides *whether* an alert may fire now; the [`Notifier`] only
//! delivers. Delivery is fire-and-forget: failures are logged and never
//! reach the decision loop.

use crate::utils::Clock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Throttles alerts to at most one per (instrument, event-type) pair per
/// cooldown window.
///
/// Permission is consumed atomically with the check: a `true` return has
/// already recorded the send timestamp, so two callers racing the same pair
/// within one window cannot both pass.
pub struct NotificationGate {
    clock: Arc<dyn Clock>,
    default_cooldown_secs: i64,
    last_sent: HashMap<(String, String), i64>,
}

impl NotificationGate {
    pub fn new(clock: Arc<dyn Clock>, default_cooldown_secs: i64) -> Self {
        Self {
            clock,
            default_cooldown_secs,
            last_sent: HashMap::new(),
        }
    }

    /// Returns true (and records now as the last-sent time) if no send for
    /// this pair happened within the cooldown; false leaves state untouched.
    pub fn may_send(
        &mut self,
        instrument: &str,
        event_type: &str,
        cooldown_secs: Option<i64>,
    ) -> bool {
        let cooldown = cooldown_secs.unwrap_or(self.default_cooldown_secs);
        let now = self.clock.epoch_secs();
        let key = (instrument.to_string(), event_type.to_string());

        match self.last_sent.get(&key) {
            Some(last) if now - last < cooldown => {
                debug!(
                    instrument,
                    event_type,
                    elapsed = now - last,
                    cooldown,
                    "notification suppressed"
                );
                false
            }
            _ => {
                self.last_sent.insert(key, now);
                true
            }
        }
    }

    /// Forget all recorded send times (process start).
    pub fn clear(&mut self) {
        self.last_sent.clear();
    }
}

/// Message delivery boundary.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` somewhere a human will see it. Must not fail the
    /// caller; implementations log their own errors.
    async fn send(&self, text: &str);
}

/// Telegram Bot API delivery.
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(len = text.len(), "telegram alert delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "telegram alert rejected");
            }
            Err(e) => {
                warn!(error = %e, "telegram alert failed");
            }
        }
    }
}

/// Fallback notifier when no Telegram credentials are configured: alerts go
/// to the log at INFO.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        info!(alert = text, "notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    fn gate(clock: Arc<ManualClock>) -> NotificationGate {
        NotificationGate::new(clock, 300)
    }

    #[test]
    fn first_send_allowed_second_suppressed() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut gate = gate(clock.clone());

        assert!(gate.may_send("ETHUSDT", "err", None));
        assert!(!gate.may_send("ETHUSDT", "err", None));

        clock.advance_secs(300);
        assert!(gate.may_send("ETHUSDT", "err", None));
    }

    #[test]
    fn pairs_are_independent() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut gate = gate(clock);

        assert!(gate.may_send("ETHUSDT", "err", None));
        assert!(gate.may_send("ETHUSDT", "grid_add", None));
        assert!(gate.may_send("BTCUSDT", "err", None));
        assert!(!gate.may_send("ETHUSDT", "err", None));
    }

    #[test]
    fn per_call_cooldown_overrides_default() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut gate = gate(clock.clone());

        assert!(gate.may_send("ETHUSDT", "rate_limit", Some(60)));
        clock.advance_secs(59);
        assert!(!gate.may_send("ETHUSDT", "rate_limit", Some(60)));
        clock.advance_secs(1);
        assert!(gate.may_send("ETHUSDT", "rate_limit", Some(60)));
    }

    #[test]
    fn suppressed_call_does_not_reset_window() {
        let clock = Arc::new(ManualClock::at_epoch());
        let mut gate = gate(clock.clone());

        assert!(gate.may_send("ETHUSDT", "err", None));
        clock.advance_secs(299);
        // suppressed, and must not push the window forward
        assert!(!gate.may_send("ETHUSDT", "err", None));
        clock.advance_secs(1);
        assert!(gate.may_send("ETHUSDT", "err", None));
    }
}
