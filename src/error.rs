//! Error types for stepper-planner.
//!
//! Configuration problems are fatal at construction time. The only runtime
//! planner error is a full queue, which blocking producers resolve by
//! backing off.

use core::fmt;

use crate::config::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepper-planner operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Planner queue error
    Planner(PlannerError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Steps per millimeter must be finite and > 0
    InvalidStepsPerUnit {
        /// Offending axis
        axis: Axis,
        /// Configured value
        value: f32,
    },
    /// Max feed rate must be finite and > 0
    InvalidMaxFeedrate {
        /// Offending axis
        axis: Axis,
        /// Configured value
        value: f32,
    },
    /// Max acceleration must be finite and > 0
    InvalidMaxAcceleration {
        /// Offending axis
        axis: Axis,
        /// Configured value
        value: f32,
    },
    /// Default acceleration must be finite and > 0
    InvalidAcceleration(f32),
    /// Retract acceleration must be finite and > 0
    InvalidRetractAcceleration(f32),
    /// Jerk limits must be finite and >= 0
    InvalidJerk(f32),
    /// Minimum feed rates must be finite and >= 0
    InvalidMinimumFeedrate(f32),
    /// Filament diameter must be finite and > 0
    InvalidFilamentDiameter(f32),
    /// Advance constant must be finite and >= 0
    InvalidAdvanceK(f32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Planner queue errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// No free slot in the block queue
    QueueFull {
        /// Number of blocks the queue can hold
        capacity: usize,
    },
    /// Feed rate after the configured floors must be finite and > 0
    InvalidFeedRate(f32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Planner(e) => write!(f, "Planner error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepsPerUnit { axis, value } => {
                write!(f, "Invalid steps per mm for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidMaxFeedrate { axis, value } => {
                write!(f, "Invalid max feed rate for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidMaxAcceleration { axis, value } => {
                write!(f, "Invalid max acceleration for axis {}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidAcceleration(v) => write!(f, "Invalid acceleration: {}. Must be > 0", v),
            ConfigError::InvalidRetractAcceleration(v) => {
                write!(f, "Invalid retract acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidJerk(v) => write!(f, "Invalid jerk limit: {}. Must be >= 0", v),
            ConfigError::InvalidMinimumFeedrate(v) => {
                write!(f, "Invalid minimum feed rate: {}. Must be >= 0", v)
            }
            ConfigError::InvalidFilamentDiameter(v) => {
                write!(f, "Invalid filament diameter: {}. Must be > 0", v)
            }
            ConfigError::InvalidAdvanceK(v) => write!(f, "Invalid advance constant: {}. Must be >= 0", v),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::QueueFull { capacity } => {
                write!(f, "Block queue full ({} blocks)", capacity)
            }
            PlannerError::InvalidFeedRate(v) => write!(f, "Invalid feed rate: {}. Must be > 0", v),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<PlannerError> for Error {
    fn from(e: PlannerError) -> Self {
        Error::Planner(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}
