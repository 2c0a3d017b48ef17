//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::axis::AxisConfig;
use super::planner::{AdvanceConfig, MotionConfig};
use super::{Axis, PlannerConfig};

/// Validate a planner configuration.
///
/// Checks:
/// - Every axis has positive steps/mm, max feed rate and max acceleration
/// - Default and retract accelerations are positive
/// - Jerk limits and feed rate floors are non-negative
/// - Advance settings (if present) have a positive filament diameter
pub fn validate_config(config: &PlannerConfig) -> Result<()> {
    for (axis, axis_config) in config.axes.iter() {
        validate_axis(axis, axis_config)?;
    }

    validate_motion(&config.motion)?;

    if let Some(ref advance) = config.advance {
        validate_advance(advance)?;
    }

    Ok(())
}

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn is_non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

fn validate_axis(axis: Axis, config: &AxisConfig) -> Result<()> {
    if !is_positive(config.steps_per_mm.0) {
        return Err(Error::Config(ConfigError::InvalidStepsPerUnit {
            axis,
            value: config.steps_per_mm.0,
        }));
    }

    if !is_positive(config.max_feedrate.0) {
        return Err(Error::Config(ConfigError::InvalidMaxFeedrate {
            axis,
            value: config.max_feedrate.0,
        }));
    }

    // Must also survive conversion to at least 1 step/s²
    if !is_positive(config.max_acceleration.0)
        || config.max_acceleration.0 * config.steps_per_mm.0 < 1.0
    {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration {
            axis,
            value: config.max_acceleration.0,
        }));
    }

    Ok(())
}

fn validate_motion(motion: &MotionConfig) -> Result<()> {
    if !is_positive(motion.acceleration.0) {
        return Err(Error::Config(ConfigError::InvalidAcceleration(
            motion.acceleration.0,
        )));
    }

    if !is_positive(motion.retract_acceleration.0) {
        return Err(Error::Config(ConfigError::InvalidRetractAcceleration(
            motion.retract_acceleration.0,
        )));
    }

    for jerk in [motion.max_xy_jerk.0, motion.max_z_jerk.0] {
        if !is_non_negative(jerk) {
            return Err(Error::Config(ConfigError::InvalidJerk(jerk)));
        }
    }

    for floor in [motion.minimum_feedrate.0, motion.min_travel_feedrate.0] {
        if !is_non_negative(floor) {
            return Err(Error::Config(ConfigError::InvalidMinimumFeedrate(floor)));
        }
    }

    Ok(())
}

fn validate_advance(advance: &AdvanceConfig) -> Result<()> {
    if !is_non_negative(advance.k) {
        return Err(Error::Config(ConfigError::InvalidAdvanceK(advance.k)));
    }

    if !is_positive(advance.filament_diameter) {
        return Err(Error::Config(ConfigError::InvalidFilamentDiameter(
            advance.filament_diameter,
        )));
    }

    Ok(())
}
