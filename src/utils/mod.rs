//! Shared utilities: decimal helpers and the injectable clock.

pub mod clock;
pub mod decimal;

pub use clock::{Clock, ManualClock, SystemClock};
