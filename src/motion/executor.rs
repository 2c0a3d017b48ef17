//! Step-indexed rate following for a planned block.
//!
//! A reference for what a step generator does with a block: it only looks at
//! the step index and the precomputed rates, never at speeds or lengths.

use libm::sqrtf;

use super::block::{Block, MotionPhase};

/// Runtime state while stepping through a block.
#[derive(Debug, Clone)]
pub struct BlockExecutor {
    /// The block being executed.
    block: Block,

    /// Step events done so far (0 to step_event_count).
    current_step: u32,

    /// Step rate for the next step event in steps/s.
    current_rate: u32,

    /// Current phase of the trapezoid.
    phase: MotionPhase,
}

impl BlockExecutor {
    /// Create a new executor for a block.
    pub fn new(block: Block) -> Self {
        let mut executor = Self {
            block,
            current_step: 0,
            current_rate: 0,
            phase: MotionPhase::Complete,
        };
        executor.reset();
        executor
    }

    /// Check if the block is complete.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == MotionPhase::Complete
    }

    /// Get the current step number.
    #[inline]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Get steps remaining.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.block.step_event_count.saturating_sub(self.current_step)
    }

    /// Get the current phase.
    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Get the step rate for the next step event.
    #[inline]
    pub fn current_rate(&self) -> u32 {
        self.current_rate
    }

    /// Get the block.
    #[inline]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Step rate at a step event index.
    pub fn rate_at(&self, step: u32) -> u32 {
        let b = &self.block;
        let accel = b.acceleration_st as f32;

        let rate = match b.phase_at(step) {
            MotionPhase::Accelerating => {
                let initial = b.initial_rate as f32;
                sqrtf(initial * initial + 2.0 * accel * step as f32)
            }
            MotionPhase::Cruising => b.nominal_rate as f32,
            MotionPhase::Decelerating => {
                let remaining = (b.step_event_count - step) as f32;
                let last = b.final_rate as f32;
                sqrtf(last * last + 2.0 * accel * remaining)
            }
            MotionPhase::Complete => return b.final_rate,
        };

        (rate as u32).min(b.nominal_rate)
    }

    /// Advance to the next step.
    ///
    /// Returns `true` if a step should be executed, `false` if complete.
    pub fn advance(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }

        self.current_step += 1;
        self.phase = self.block.phase_at(self.current_step);
        if self.is_complete() {
            self.current_rate = self.block.final_rate;
            return false;
        }

        self.current_rate = self.rate_at(self.current_step);
        true
    }

    /// Reset the executor to the beginning of the block.
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.phase = self.block.phase_at(0);
        self.current_rate = if self.is_complete() {
            0
        } else {
            self.block.initial_rate.max(self.rate_at(0))
        };
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.block.step_event_count == 0 {
            1.0
        } else {
            self.current_step as f32 / self.block.step_event_count as f32
        }
    }
}
