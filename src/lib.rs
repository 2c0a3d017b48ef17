//! # stepper-planner
//!
//! Look-ahead motion planner for stepper-driven 3D printers and similar
//! machines, with `no_std` support.
//!
//! ## Features
//!
//! - **Configuration-driven**: Axis resolution, limits and jerk in TOML files
//! - **Look-ahead**: Entry speeds reconciled over the whole queue on every move
//! - **Step-domain output**: Each block carries its step rates and ramp indices
//! - **Pressure advance**: Optional extra filament steps while accelerating
//! - **no_std compatible**: Core library works without standard library
//! - **Producer / consumer split**: Plan on one thread, execute on another (`std`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_planner::{Planner, Position};
//!
//! let config = stepper_planner::load_config("printer.toml")?;
//! let mut planner: Planner = Planner::new(config)?;
//!
//! planner.buffer_line(Position::new(8000, 0, 0, 0), 50.0, 0)?;
//!
//! while let Some(block) = planner.current_block() {
//!     // hand accelerate_until / decelerate_after / rates to the step generator
//!     planner.discard_current_block();
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): TOML file loading and the producer / consumer split
//! - `defmt`: Logging through defmt for embedded targets
//! - `log`: Logging through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[macro_use]
mod fmt;

// Core modules
pub mod config;
pub mod error;
pub mod motion;
pub mod planner;

// Re-exports for ergonomic API
pub use config::{validate_config, Axis, PlannerConfig};
pub use error::{Error, Result};
pub use motion::{Block, BlockExecutor, MotionPhase, PressureAdvance, TrapezoidGenerator};
pub use planner::{Planned, Planner, Position, DEFAULT_BLOCK_BUFFER_SIZE};

#[cfg(feature = "std")]
pub use planner::{Consumer, Producer};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{MmPerSec, MmPerSecSquared, StepsPerMm};
