//! Risk controls applied around the grid strategy:
//! - hedge-leg value-ratio rebalancing
//! - account-relative exposure capping
//! - one-sided position age monitoring

mod exposure;
mod hedge;
mod timeout;

pub use exposure::{ExposureConfig, ExposureGuard};
pub use hedge::{HedgeConfig, HedgeRebalancer};
pub use timeout::{timed_out, PositionTimeoutMonitor};
