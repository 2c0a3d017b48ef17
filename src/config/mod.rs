//! Configuration module for stepper-planner.
//!
//! Provides the externally owned machine configuration the planner reads:
//! per-axis resolution and limits, jerk limits, feed rate floors and the
//! optional pressure advance settings. Loadable from TOML (with `std`).

mod axis;
mod limits;
#[cfg(feature = "std")]
mod loader;
mod planner;
pub mod units;
mod validation;

pub use axis::{AxesConfig, Axis, AxisConfig, NUM_AXIS};
pub use limits::MachineLimits;
pub use planner::{AdvanceConfig, MotionConfig, PlannerConfig};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{MmPerSec, MmPerSecSquared, StepsPerMm};
