//! Motion module for stepper-planner.
//!
//! Blocks, junction speeds, trapezoid generation, pressure advance and a
//! reference step-indexed executor.

mod advance;
mod block;
mod executor;
mod junction;
mod trapezoid;

pub use advance::{PressureAdvance, ADVANCE_SCALE};
pub use block::{Block, MotionPhase};
pub use executor::BlockExecutor;
pub use junction::{JunctionLimits, MoveVelocity};
pub use trapezoid::{acceleration_distance, intersection_distance, trapezoid_bounds, TrapezoidGenerator};
