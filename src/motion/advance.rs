//! Pressure advance compensation.
//!
//! The filament behaves like a spring between the drive gear and the nozzle:
//! extra feed steps are needed while the flow rises and fewer while it falls.
//! By Bernoulli the required advance grows with the square of the
//! volumetric flow, so
//!
//! ```text
//! advance (steps) = steps_per_cubic_mm_e · K · (flow mm³/s)²
//! ```
//!
//! Advance values are stored in 24.8 fixed point for the step generator.

use core::f32::consts::PI;

use super::block::Block;
use super::trapezoid::acceleration_distance;
use crate::config::{Axis, PlannerConfig};

/// Fixed-point scale of the advance fields (8 fractional bits).
pub const ADVANCE_SCALE: f32 = 256.0;

/// Pressure advance compensator for the filament feed axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureAdvance {
    k: f32,
    extrusion_area: f32,
    steps_per_cubic_mm_e: f32,
}

impl PressureAdvance {
    /// Create a compensator.
    ///
    /// * `k` - advance constant in s²/mm³
    /// * `filament_diameter` - in mm
    /// * `e_steps_per_mm` - extruder steps per mm of filament
    pub fn new(k: f32, filament_diameter: f32, e_steps_per_mm: f32) -> Self {
        let extrusion_area = 0.25 * filament_diameter * filament_diameter * PI;
        Self {
            k,
            extrusion_area,
            steps_per_cubic_mm_e: e_steps_per_mm / extrusion_area,
        }
    }

    /// Build a compensator from the `[advance]` section, if present.
    pub fn from_config(config: &PlannerConfig) -> Option<Self> {
        config.advance.map(|advance| {
            Self::new(
                advance.k,
                advance.filament_diameter,
                config.steps_per_mm(Axis::E),
            )
        })
    }

    /// Advance constant in s²/mm³.
    #[inline]
    pub fn k(&self) -> f32 {
        self.k
    }

    /// Filament cross-section in mm².
    #[inline]
    pub fn extrusion_area(&self) -> f32 {
        self.extrusion_area
    }

    /// Extruder steps per mm³ of filament.
    #[inline]
    pub fn steps_per_cubic_mm_e(&self) -> f32 {
        self.steps_per_cubic_mm_e
    }

    /// Peak advance for a block and the rate at which it builds up.
    ///
    /// `e_speed` is the filament speed in mm/s at the block's nominal speed.
    /// Blocks without both Cartesian and filament motion get no advance.
    pub fn plan_block(&self, block: &mut Block, e_speed: f32, drop_segments: u32) {
        if block.steps(Axis::E) == 0 || block.is_extruder_only(drop_segments) {
            block.advance = 0.0;
            block.advance_rate = 0;
            return;
        }

        let flow = e_speed * self.extrusion_area;
        let advance = self.steps_per_cubic_mm_e * self.k * flow * flow * ADVANCE_SCALE;
        let acc_dist = acceleration_distance(
            0.0,
            block.nominal_rate as f32,
            block.acceleration_st as f32,
        );

        block.advance = advance;
        block.advance_rate = if acc_dist > 0.0 {
            (advance / acc_dist) as i32
        } else {
            0
        };
    }

    /// Scale the peak advance to the block's entry and exit speeds.
    ///
    /// Factors are speeds relative to the nominal speed.
    pub fn finalize(&self, block: &mut Block, entry_factor: f32, exit_factor: f32) {
        block.initial_advance = (block.advance * entry_factor * entry_factor) as i32;
        block.final_advance = (block.advance * exit_factor * exit_factor) as i32;
    }
}
