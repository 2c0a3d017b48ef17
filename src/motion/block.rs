//! Planned motion blocks.

use crate::config::{Axis, NUM_AXIS};

/// Step-indexed phase of a block's velocity profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// Step rate rising from `initial_rate`.
    Accelerating,
    /// Step rate held at `nominal_rate`.
    Cruising,
    /// Step rate falling toward `final_rate`.
    Decelerating,
    /// All step events done.
    Complete,
}

/// One linear, jerk-limited move with a trapezoidal velocity profile.
///
/// Speeds are in mm/s along the move, rates in step events per second along
/// the dominant axis. Everything a step generator needs is in the rate and
/// step index fields; it must not recompute any physics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Block {
    /// Signed step delta per axis (X, Y, Z, E).
    pub delta_steps: [i32; NUM_AXIS],

    /// Step events needed to traverse the block (largest absolute delta).
    pub step_event_count: u32,

    /// Bit `axis.bit()` set when that axis moves in the negative direction.
    pub direction_bits: u8,

    /// Extruder whose feed axis the E steps drive.
    pub active_extruder: u8,

    /// Length of the move in mm (Cartesian, or filament length for E-only moves).
    pub millimeters: f32,

    /// Cruise speed if fully reached.
    pub nominal_speed: f32,

    /// Resolved speed at the start of the block.
    pub entry_speed: f32,

    /// Upper bound on `entry_speed` from the junction and nominal speeds.
    pub max_entry_speed: f32,

    /// Speed at the end of the block the trapezoid was generated for.
    pub exit_speed: f32,

    /// Acceleration in mm/s².
    pub acceleration: f32,

    /// Entry speed may still change; trapezoid needs regenerating.
    pub recalculate_flag: bool,

    /// The block can decelerate from nominal speed to rest within its length.
    pub nominal_length_flag: bool,

    /// Step rate at nominal speed.
    pub nominal_rate: u32,

    /// Step rate at the start of the block.
    pub initial_rate: u32,

    /// Step rate at the end of the block.
    pub final_rate: u32,

    /// Acceleration in steps/s².
    pub acceleration_st: u32,

    /// Step event index at which acceleration stops.
    pub accelerate_until: u32,

    /// Step event index after which deceleration starts.
    pub decelerate_after: u32,

    /// Peak extra E steps at nominal speed (24.8 fixed point, before scaling).
    pub advance: f32,

    /// Change of advance per acceleration step (24.8 fixed point).
    pub advance_rate: i32,

    /// Extra E steps at entry (24.8 fixed point).
    pub initial_advance: i32,

    /// Extra E steps at exit (24.8 fixed point).
    pub final_advance: i32,

    /// Set by the consumer once it starts executing the block.
    pub busy: bool,
}

impl Block {
    /// Build the geometric part of a block from per-axis step deltas.
    pub fn from_delta(delta_steps: [i32; NUM_AXIS], active_extruder: u8) -> Self {
        let mut direction_bits = 0;
        let mut step_event_count = 0;
        for axis in Axis::ALL {
            let delta = delta_steps[axis.index()];
            if delta < 0 {
                direction_bits |= axis.bit();
            }
            step_event_count = step_event_count.max(delta.unsigned_abs());
        }

        Self {
            delta_steps,
            step_event_count,
            direction_bits,
            active_extruder,
            ..Self::default()
        }
    }

    /// Absolute step count of an axis.
    #[inline]
    pub fn steps(&self, axis: Axis) -> u32 {
        self.delta_steps[axis.index()].unsigned_abs()
    }

    /// Absolute step counts of all axes.
    pub fn abs_steps(&self) -> [u32; NUM_AXIS] {
        let mut steps = [0; NUM_AXIS];
        for axis in Axis::ALL {
            steps[axis.index()] = self.steps(axis);
        }
        steps
    }

    /// Whether `axis` moves in the negative direction.
    #[inline]
    pub fn is_negative(&self, axis: Axis) -> bool {
        self.direction_bits & axis.bit() != 0
    }

    /// Whether no Cartesian axis moves more than `threshold` steps.
    pub fn is_extruder_only(&self, threshold: u32) -> bool {
        Axis::CARTESIAN.iter().all(|axis| self.steps(*axis) <= threshold)
    }

    /// Number of steps spent at the nominal (or peak) rate.
    #[inline]
    pub fn plateau_steps(&self) -> u32 {
        self.decelerate_after.saturating_sub(self.accelerate_until)
    }

    /// Phase at a given step event index.
    pub fn phase_at(&self, step: u32) -> MotionPhase {
        if step >= self.step_event_count {
            MotionPhase::Complete
        } else if step < self.accelerate_until {
            MotionPhase::Accelerating
        } else if step < self.decelerate_after {
            MotionPhase::Cruising
        } else {
            MotionPhase::Decelerating
        }
    }
}
