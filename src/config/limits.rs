//! Machine limits derived from the planner configuration.

use super::axis::{Axis, NUM_AXIS};
use super::planner::PlannerConfig;
use super::units::StepsPerMm;

/// Derived per-axis parameters computed from configuration.
///
/// These are computed once when the configuration is installed and used by
/// every `buffer_line` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineLimits {
    /// Steps per millimeter, per axis.
    pub steps_per_mm: [f32; NUM_AXIS],

    /// Maximum feed rate in mm/s, per axis.
    pub max_feedrate: [f32; NUM_AXIS],

    /// Maximum acceleration in steps/s², per axis.
    pub max_acceleration_steps: [u32; NUM_AXIS],
}

impl MachineLimits {
    /// Compute machine limits from configuration.
    pub fn from_config(config: &PlannerConfig) -> Self {
        let mut steps_per_mm = [0.0; NUM_AXIS];
        let mut max_feedrate = [0.0; NUM_AXIS];
        let mut max_acceleration_steps = [0; NUM_AXIS];

        for (axis, axis_config) in config.axes.iter() {
            let i = axis.index();
            steps_per_mm[i] = axis_config.steps_per_mm.0;
            max_feedrate[i] = axis_config.max_feedrate.0;
            max_acceleration_steps[i] =
                (axis_config.max_acceleration.0 * axis_config.steps_per_mm.0) as u32;
        }

        Self {
            steps_per_mm,
            max_feedrate,
            max_acceleration_steps,
        }
    }

    /// Convert a step delta on an axis to millimeters.
    #[inline]
    pub fn steps_to_mm(&self, axis: Axis, steps: i32) -> f32 {
        StepsPerMm(self.steps_per_mm[axis.index()]).steps_to_mm(steps)
    }

    /// Convert step deltas on all axes to millimeters.
    pub fn delta_mm(&self, delta_steps: &[i32; NUM_AXIS]) -> [f32; NUM_AXIS] {
        let mut mm = [0.0; NUM_AXIS];
        for axis in Axis::ALL {
            mm[axis.index()] = self.steps_to_mm(axis, delta_steps[axis.index()]);
        }
        mm
    }

    /// Largest factor (<= 1) keeping every axis speed within its max feed rate.
    pub fn feedrate_factor(&self, axis_speeds: &[f32; NUM_AXIS]) -> f32 {
        let mut factor = 1.0f32;
        for (speed, max) in axis_speeds.iter().zip(self.max_feedrate.iter()) {
            let speed = libm::fabsf(*speed);
            if speed > *max {
                factor = factor.min(*max / speed);
            }
        }
        factor
    }

    /// Limit a block acceleration (steps/s² along the dominant axis) so that no
    /// axis exceeds its own maximum acceleration.
    pub fn limit_acceleration(
        &self,
        acceleration_st: u32,
        abs_steps: &[u32; NUM_AXIS],
        step_event_count: u32,
    ) -> u32 {
        let mut limited = acceleration_st;
        for (steps, max) in abs_steps.iter().zip(self.max_acceleration_steps.iter()) {
            if *steps == 0 {
                continue;
            }
            let share = limited as f32 * *steps as f32 / step_event_count as f32;
            if share > *max as f32 {
                limited = (*max as f32 * step_event_count as f32 / *steps as f32) as u32;
            }
        }
        limited
    }
}
