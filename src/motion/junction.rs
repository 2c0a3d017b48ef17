//! Junction speed limits between consecutive blocks.

use libm::{fabsf, sqrtf};

use crate::config::{Axis, MotionConfig, NUM_AXIS};

/// Below this nominal speed (mm/s) the previous move counts as standing still.
const STANDSTILL_SPEED: f32 = 0.0001;

/// Per-axis velocity of a move at its nominal speed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveVelocity {
    /// Signed axis speeds in mm/s (X, Y, Z, E).
    pub axis_speeds: [f32; NUM_AXIS],
    /// Speed along the move in mm/s.
    pub nominal_speed: f32,
}

impl MoveVelocity {
    /// Create a move velocity.
    pub const fn new(axis_speeds: [f32; NUM_AXIS], nominal_speed: f32) -> Self {
        Self {
            axis_speeds,
            nominal_speed,
        }
    }

    #[inline]
    fn speed(&self, axis: Axis) -> f32 {
        self.axis_speeds[axis.index()]
    }

    fn reverses(&self, next: &MoveVelocity, axis: Axis) -> bool {
        self.speed(axis) * next.speed(axis) < 0.0
    }
}

/// Jerk-limited junction speed calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionLimits {
    /// Largest instantaneous XY velocity change in mm/s.
    pub max_xy_jerk: f32,
    /// Largest instantaneous Z velocity change in mm/s.
    pub max_z_jerk: f32,
}

impl JunctionLimits {
    /// Create junction limits.
    pub const fn new(max_xy_jerk: f32, max_z_jerk: f32) -> Self {
        Self {
            max_xy_jerk,
            max_z_jerk,
        }
    }

    /// Take the jerk limits from the motion configuration.
    pub fn from_config(motion: &MotionConfig) -> Self {
        Self::new(motion.max_xy_jerk.0, motion.max_z_jerk.0)
    }

    /// Maximum speed through the junction between `previous` and `current`.
    ///
    /// `previous` is `None` when nothing is queued ahead of the new move, in
    /// which case the move starts from rest. The result never exceeds either
    /// move's nominal speed.
    pub fn junction_speed(&self, previous: Option<&MoveVelocity>, current: &MoveVelocity) -> f32 {
        let Some(previous) = previous.filter(|p| p.nominal_speed > STANDSTILL_SPEED) else {
            return 0.0;
        };

        let dx = current.speed(Axis::X) - previous.speed(Axis::X);
        let dy = current.speed(Axis::Y) - previous.speed(Axis::Y);
        let xy_jerk = sqrtf(dx * dx + dy * dy);
        let z_jerk = fabsf(current.speed(Axis::Z) - previous.speed(Axis::Z));

        // Reversing through a jerk violation needs a full stop
        let xy_reversal = previous.reverses(current, Axis::X) || previous.reverses(current, Axis::Y);
        if xy_reversal && xy_jerk > self.max_xy_jerk {
            return 0.0;
        }
        if previous.reverses(current, Axis::Z) && z_jerk > self.max_z_jerk {
            return 0.0;
        }

        let mut factor = 1.0f32;
        if xy_jerk > self.max_xy_jerk {
            factor = self.max_xy_jerk / xy_jerk;
        }
        if z_jerk > self.max_z_jerk {
            factor = factor.min(self.max_z_jerk / z_jerk);
        }

        previous.nominal_speed.min(current.nominal_speed) * factor
    }
}
