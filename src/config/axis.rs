//! Axis identifiers and per-axis configuration.

use core::fmt;

use serde::Deserialize;

use super::units::{MmPerSec, MmPerSecSquared, StepsPerMm};

/// Number of planned axes (X, Y, Z, E).
pub const NUM_AXIS: usize = 4;

/// A planned axis. The order matches every per-axis array in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// Cartesian X.
    X,
    /// Cartesian Y.
    Y,
    /// Cartesian Z.
    Z,
    /// Filament feed.
    E,
}

impl Axis {
    /// All axes in array order.
    pub const ALL: [Axis; NUM_AXIS] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// The Cartesian axes.
    pub const CARTESIAN: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index into per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit used for this axis in a block's direction bits.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
            Axis::E => "E",
        };
        f.write_str(name)
    }
}

/// Configuration of a single axis from TOML.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisConfig {
    /// Motor steps per millimeter of travel (or of filament for E).
    pub steps_per_mm: StepsPerMm,

    /// Maximum speed of this axis.
    #[serde(rename = "max_feedrate_mm_per_sec")]
    pub max_feedrate: MmPerSec,

    /// Maximum acceleration of this axis.
    #[serde(rename = "max_acceleration_mm_per_sec2")]
    pub max_acceleration: MmPerSecSquared,
}

impl AxisConfig {
    /// Create a new axis configuration.
    pub const fn new(steps_per_mm: f32, max_feedrate: f32, max_acceleration: f32) -> Self {
        Self {
            steps_per_mm: StepsPerMm(steps_per_mm),
            max_feedrate: MmPerSec(max_feedrate),
            max_acceleration: MmPerSecSquared(max_acceleration),
        }
    }
}

/// Per-axis configuration for X, Y, Z and E.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxesConfig {
    /// X axis.
    pub x: AxisConfig,
    /// Y axis.
    pub y: AxisConfig,
    /// Z axis.
    pub z: AxisConfig,
    /// Extruder (filament feed) axis.
    pub e: AxisConfig,
}

impl AxesConfig {
    /// Get the configuration of one axis.
    pub fn get(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
            Axis::E => &self.e,
        }
    }

    /// Get mutable configuration of one axis.
    pub fn get_mut(&mut self, axis: Axis) -> &mut AxisConfig {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
            Axis::E => &mut self.e,
        }
    }

    /// Iterate axes with their configuration, in array order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &AxisConfig)> {
        Axis::ALL.into_iter().map(move |axis| (axis, self.get(axis)))
    }
}

impl Default for AxesConfig {
    /// A typical belt-driven printer with a leadscrew Z and geared extruder.
    fn default() -> Self {
        Self {
            x: AxisConfig::new(80.0, 500.0, 9000.0),
            y: AxisConfig::new(80.0, 500.0, 9000.0),
            z: AxisConfig::new(400.0, 5.0, 100.0),
            e: AxisConfig::new(95.0, 25.0, 10000.0),
        }
    }
}
