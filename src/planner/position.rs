//! Position tracking for the planner.
//!
//! Holds the last planned endpoint in absolute steps.

use crate::config::{Axis, NUM_AXIS};

/// Absolute machine position in steps (X, Y, Z, E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    steps: [i32; NUM_AXIS],
}

impl Position {
    /// Create a position from absolute step counts.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32, e: i32) -> Self {
        Self { steps: [x, y, z, e] }
    }

    /// Create a position from an axis-indexed array.
    #[inline]
    pub const fn from_steps(steps: [i32; NUM_AXIS]) -> Self {
        Self { steps }
    }

    /// Get all axis positions in steps.
    #[inline]
    pub fn steps(&self) -> [i32; NUM_AXIS] {
        self.steps
    }

    /// Get one axis position in steps.
    #[inline]
    pub fn axis(&self, axis: Axis) -> i32 {
        self.steps[axis.index()]
    }

    /// Set one axis position in steps.
    #[inline]
    pub fn set_axis(&mut self, axis: Axis, steps: i32) {
        self.steps[axis.index()] = steps;
    }

    /// Steps needed on each axis to reach `target`.
    pub fn delta_to(&self, target: &Position) -> [i32; NUM_AXIS] {
        let mut delta = [0; NUM_AXIS];
        for axis in Axis::ALL {
            let i = axis.index();
            delta[i] = target.steps[i].wrapping_sub(self.steps[i]);
        }
        delta
    }
}

impl From<[i32; NUM_AXIS]> for Position {
    fn from(steps: [i32; NUM_AXIS]) -> Self {
        Self::from_steps(steps)
    }
}
