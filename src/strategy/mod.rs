//! Grid trading strategy components.
//!
//! Pure decision logic, one concern per module:
//! - grid spacing derivation from volatility and the live ladder
//! - equity-based order sizing
//! - indicator rule-table entry scoring
//! - ladder placement planning

mod interval;
mod planner;
mod signal;
mod sizer;

pub use interval::{GridIntervalCalculator, IntervalConfig};
pub use planner::{GridPlanner, PlannerConfig};
pub use signal::{
    default_rules, Bias, EntrySignal, EntrySignalScorer, SignalConfig, SignalRule,
};
pub use sizer::{PositionSizer, SizerConfig};
