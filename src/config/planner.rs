//! Planner configuration - root configuration structure.

use serde::Deserialize;

use super::axis::{AxesConfig, Axis};
use super::units::{MmPerSec, MmPerSecSquared};

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlannerConfig {
    /// Per-axis resolution and limits.
    pub axes: AxesConfig,

    /// Machine-wide motion settings.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Pressure advance settings. Absent means disabled.
    #[serde(default)]
    pub advance: Option<AdvanceConfig>,
}

impl PlannerConfig {
    /// Create a configuration from axes with default motion settings.
    pub fn new(axes: AxesConfig) -> Self {
        Self {
            axes,
            motion: MotionConfig::default(),
            advance: None,
        }
    }

    /// Steps per millimeter of an axis.
    #[inline]
    pub fn steps_per_mm(&self, axis: Axis) -> f32 {
        self.axes.get(axis).steps_per_mm.0
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(AxesConfig::default())
    }
}

/// Machine-wide motion settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MotionConfig {
    /// Acceleration used for moves with Cartesian motion.
    #[serde(default = "default_acceleration", rename = "acceleration_mm_per_sec2")]
    pub acceleration: MmPerSecSquared,

    /// Acceleration used for extruder-only moves (retract / prime).
    #[serde(
        default = "default_retract_acceleration",
        rename = "retract_acceleration_mm_per_sec2"
    )]
    pub retract_acceleration: MmPerSecSquared,

    /// Largest XY speed change allowed at a junction without slowing down.
    #[serde(default = "default_xy_jerk", rename = "max_xy_jerk_mm_per_sec")]
    pub max_xy_jerk: MmPerSec,

    /// Largest Z speed change allowed at a junction without slowing down.
    #[serde(default = "default_z_jerk", rename = "max_z_jerk_mm_per_sec")]
    pub max_z_jerk: MmPerSec,

    /// Feed rate floor for moves that extrude.
    #[serde(default, rename = "minimum_feedrate_mm_per_sec")]
    pub minimum_feedrate: MmPerSec,

    /// Feed rate floor for travel moves.
    #[serde(default, rename = "min_travel_feedrate_mm_per_sec")]
    pub min_travel_feedrate: MmPerSec,

    /// Moves shorter than this (in microseconds) are slowed down while the
    /// queue is draining. Zero disables the slowdown.
    #[serde(default)]
    pub min_segment_time_us: u32,

    /// Moves with at most this many step events are dropped.
    #[serde(default)]
    pub drop_segments: u32,

    /// Floor for block initial and final step rates (steps/s).
    #[serde(default)]
    pub minimum_step_rate: u32,
}

fn default_acceleration() -> MmPerSecSquared {
    MmPerSecSquared(3000.0)
}

fn default_retract_acceleration() -> MmPerSecSquared {
    MmPerSecSquared(3000.0)
}

fn default_xy_jerk() -> MmPerSec {
    MmPerSec(20.0)
}

fn default_z_jerk() -> MmPerSec {
    MmPerSec(0.4)
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            acceleration: default_acceleration(),
            retract_acceleration: default_retract_acceleration(),
            max_xy_jerk: default_xy_jerk(),
            max_z_jerk: default_z_jerk(),
            minimum_feedrate: MmPerSec(0.0),
            min_travel_feedrate: MmPerSec(0.0),
            min_segment_time_us: 0,
            drop_segments: 0,
            minimum_step_rate: 0,
        }
    }
}

/// Pressure advance settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AdvanceConfig {
    /// Advance constant in s²/mm³.
    pub k: f32,

    /// Filament diameter in millimeters.
    #[serde(rename = "filament_diameter_mm")]
    pub filament_diameter: f32,
}

impl AdvanceConfig {
    /// Create advance settings.
    pub const fn new(k: f32, filament_diameter: f32) -> Self {
        Self { k, filament_diameter }
    }
}
