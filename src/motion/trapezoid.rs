//! Trapezoid generation.
//!
//! Turns a block's resolved entry and exit speeds into step rates and the
//! step indices where acceleration ends and deceleration begins.

use libm::{ceilf, floorf};

use super::advance::PressureAdvance;
use super::block::Block;

/// Steps needed to change from `initial_rate` to `target_rate` at a constant
/// `acceleration` (all in steps, steps/s and steps/s²).
#[inline]
pub fn acceleration_distance(initial_rate: f32, target_rate: f32, acceleration: f32) -> f32 {
    if acceleration == 0.0 {
        return 0.0;
    }
    (target_rate * target_rate - initial_rate * initial_rate) / (2.0 * acceleration)
}

/// Step index where accelerating from `initial_rate` meets decelerating to
/// `final_rate` within `distance` steps.
///
/// Used when a block is too short to reach its nominal rate.
#[inline]
pub fn intersection_distance(initial_rate: f32, final_rate: f32, acceleration: f32, distance: f32) -> f32 {
    if acceleration == 0.0 {
        return 0.0;
    }
    (2.0 * acceleration * distance - initial_rate * initial_rate + final_rate * final_rate)
        / (4.0 * acceleration)
}

/// Step indices of a trapezoid: `(accelerate_until, decelerate_after)`.
///
/// Always satisfies `accelerate_until <= decelerate_after <= step_event_count`.
pub fn trapezoid_bounds(
    step_event_count: u32,
    initial_rate: u32,
    nominal_rate: u32,
    final_rate: u32,
    acceleration_st: u32,
) -> (u32, u32) {
    if acceleration_st == 0 {
        return (0, step_event_count);
    }

    let total = step_event_count as i64;
    let accel = acceleration_st as f32;

    let mut accelerate_steps = ceilf(acceleration_distance(
        initial_rate as f32,
        nominal_rate as f32,
        accel,
    )) as i64;
    let decelerate_steps = floorf(acceleration_distance(
        nominal_rate as f32,
        final_rate as f32,
        -accel,
    )) as i64;

    let mut plateau_steps = total - accelerate_steps - decelerate_steps;

    // Too short to reach nominal rate: triangle instead of trapezoid
    if plateau_steps < 0 {
        accelerate_steps = ceilf(intersection_distance(
            initial_rate as f32,
            final_rate as f32,
            accel,
            total as f32,
        )) as i64;
        accelerate_steps = accelerate_steps.clamp(0, total);
        plateau_steps = 0;
    }

    let accelerate_until = accelerate_steps.clamp(0, total);
    let decelerate_after = (accelerate_until + plateau_steps).clamp(accelerate_until, total);

    (accelerate_until as u32, decelerate_after as u32)
}

/// Computes the step-domain profile of blocks.
///
/// Pressure advance is composed in as an optional strategy so either variant
/// can run without rebuilding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrapezoidGenerator {
    minimum_step_rate: u32,
    advance: Option<PressureAdvance>,
}

impl TrapezoidGenerator {
    /// Create a generator.
    pub const fn new(minimum_step_rate: u32, advance: Option<PressureAdvance>) -> Self {
        Self {
            minimum_step_rate,
            advance,
        }
    }

    /// Floor applied to initial and final step rates.
    #[inline]
    pub fn minimum_step_rate(&self) -> u32 {
        self.minimum_step_rate
    }

    /// The pressure advance compensator, if enabled.
    #[inline]
    pub fn advance(&self) -> Option<&PressureAdvance> {
        self.advance.as_ref()
    }

    /// Replace the pressure advance compensator.
    pub fn set_advance(&mut self, advance: Option<PressureAdvance>) {
        self.advance = advance;
    }

    fn step_rate(&self, nominal_rate: u32, factor: f32) -> u32 {
        let rate = ceilf(nominal_rate as f32 * factor) as u32;
        rate.max(self.minimum_step_rate).min(nominal_rate)
    }

    /// Generate the trapezoid of `block` from its `entry_speed` to `exit_speed`.
    pub fn generate(&self, block: &mut Block, exit_speed: f32) {
        let (entry_factor, exit_factor) = if block.nominal_speed > 0.0 {
            (
                (block.entry_speed / block.nominal_speed).clamp(0.0, 1.0),
                (exit_speed / block.nominal_speed).clamp(0.0, 1.0),
            )
        } else {
            (0.0, 0.0)
        };

        let initial_rate = self.step_rate(block.nominal_rate, entry_factor);
        let final_rate = self.step_rate(block.nominal_rate, exit_factor);

        let (accelerate_until, decelerate_after) = trapezoid_bounds(
            block.step_event_count,
            initial_rate,
            block.nominal_rate,
            final_rate,
            block.acceleration_st,
        );

        block.initial_rate = initial_rate;
        block.final_rate = final_rate;
        block.accelerate_until = accelerate_until;
        block.decelerate_after = decelerate_after;
        block.exit_speed = exit_speed;

        if let Some(advance) = &self.advance {
            advance.finalize(block, entry_factor, exit_factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(step_event_count: u32, nominal_rate: u32, acceleration_st: u32) -> Block {
        Block {
            step_event_count,
            nominal_rate,
            nominal_speed: nominal_rate as f32 / 100.0,
            acceleration_st,
            ..Block::default()
        }
    }

    #[test]
    fn test_rest_to_rest_plateau() {
        // 10 mm at 10 mm/s, 100 steps/mm, 500 mm/s²
        let mut b = block(1000, 1000, 50_000);
        TrapezoidGenerator::default().generate(&mut b, 0.0);

        assert_eq!(b.initial_rate, 0);
        assert_eq!(b.final_rate, 0);
        assert_eq!(b.accelerate_until, 10);
        assert_eq!(b.decelerate_after, 990);
    }

    #[test]
    fn test_triangle_profile() {
        let mut b = block(100, 10_000, 50_000);
        TrapezoidGenerator::default().generate(&mut b, 0.0);

        assert_eq!(b.accelerate_until, b.decelerate_after);
        assert_eq!(b.accelerate_until, 50);
    }

    #[test]
    fn test_asymmetric_triangle() {
        // Entering at half speed with room for only a short ramp down
        let mut b = block(100, 10_000, 50_000);
        b.entry_speed = b.nominal_speed * 0.5;
        TrapezoidGenerator::default().generate(&mut b, 0.0);

        assert_eq!(b.initial_rate, 5000);
        assert_eq!(b.accelerate_until, b.decelerate_after);
        assert!(b.accelerate_until < 50);
    }

    #[test]
    fn test_cruise_through() {
        let mut b = block(1000, 1000, 50_000);
        let exit = b.nominal_speed;
        b.entry_speed = exit;
        TrapezoidGenerator::default().generate(&mut b, exit);

        assert_eq!(b.initial_rate, 1000);
        assert_eq!(b.final_rate, 1000);
        assert_eq!(b.accelerate_until, 0);
        assert_eq!(b.decelerate_after, 1000);
        assert_eq!(b.exit_speed, b.nominal_speed);
    }

    #[test]
    fn test_minimum_step_rate() {
        let mut b = block(1000, 1000, 50_000);
        TrapezoidGenerator::new(120, None).generate(&mut b, 0.0);

        assert_eq!(b.initial_rate, 120);
        assert_eq!(b.final_rate, 120);
        assert!(b.accelerate_until <= b.decelerate_after);
    }

    #[test]
    fn test_minimum_above_nominal() {
        let mut b = block(10, 50, 50_000);
        TrapezoidGenerator::new(120, None).generate(&mut b, 0.0);

        assert_eq!(b.initial_rate, 50);
        assert_eq!(b.accelerate_until, 0);
        assert_eq!(b.decelerate_after, 10);
    }

    #[test]
    fn test_zero_acceleration() {
        assert_eq!(trapezoid_bounds(500, 0, 1000, 0, 0), (0, 500));
    }

    #[test]
    fn test_advance_strategy_applied() {
        let pa = PressureAdvance::new(0.05, 1.75, 100.0);
        let mut b = block(1000, 1000, 50_000);
        b.advance = 512.0;
        b.entry_speed = b.nominal_speed;

        TrapezoidGenerator::new(0, Some(pa)).generate(&mut b, 0.0);
        assert_eq!(b.initial_advance, 512);
        assert_eq!(b.final_advance, 0);

        let mut plain = block(1000, 1000, 50_000);
        plain.advance = 512.0;
        TrapezoidGenerator::default().generate(&mut plain, 0.0);
        assert_eq!(plain.initial_advance, 0);
    }
}
