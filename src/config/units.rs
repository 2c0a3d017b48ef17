//! Unit types for physical quantities.
//!
//! Type-safe wrappers for the millimeter-based quantities found in the
//! configuration. The planner works on the raw values internally.

use core::ops::Mul;

use serde::Deserialize;

/// Linear speed in millimeters per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSec(pub f32);

impl MmPerSec {
    /// Create a new MmPerSec value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Mul<f32> for MmPerSec {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Linear acceleration in millimeters per second squared.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSecSquared(pub f32);

impl MmPerSecSquared {
    /// Create a new MmPerSecSquared value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Mul<f32> for MmPerSecSquared {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Axis resolution in steps per millimeter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct StepsPerMm(pub f32);

impl StepsPerMm {
    /// Create a new StepsPerMm value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert a step count to millimeters.
    #[inline]
    pub fn steps_to_mm(self, steps: i32) -> f32 {
        steps as f32 / self.0
    }

    /// Convert a length in millimeters to the nearest step count.
    #[inline]
    pub fn mm_to_steps(self, mm: f32) -> i32 {
        libm::roundf(mm * self.0) as i32
    }

    /// Convert a per-millimeter rate into a per-step rate.
    #[inline]
    pub fn to_steps_rate(self, per_mm: f32) -> f32 {
        per_mm * self.0
    }
}

/// Extension trait for creating unit types from primitives.
pub trait UnitExt {
    /// Convert to MmPerSec.
    fn mm_per_sec(self) -> MmPerSec;
    /// Convert to MmPerSecSquared.
    fn mm_per_sec_squared(self) -> MmPerSecSquared;
    /// Convert to StepsPerMm.
    fn steps_per_mm(self) -> StepsPerMm;
}

impl UnitExt for f32 {
    #[inline]
    fn mm_per_sec(self) -> MmPerSec {
        MmPerSec(self)
    }

    #[inline]
    fn mm_per_sec_squared(self) -> MmPerSecSquared {
        MmPerSecSquared(self)
    }

    #[inline]
    fn steps_per_mm(self) -> StepsPerMm {
        StepsPerMm(self)
    }
}
