//! Look-ahead motion planner.
//!
//! [`Planner`] turns absolute step targets and feed rates into a queue of
//! blocks with jerk-limited trapezoidal profiles. Producer operations
//! ([`buffer_line`](Planner::buffer_line), position redefinition) and consumer
//! operations ([`current_block`](Planner::current_block),
//! [`discard_current_block`](Planner::discard_current_block)) are methods on
//! the same value for single-context use; with `std`,
//! [`split`](Planner::split) hands them to two threads.

mod position;
mod queue;
mod recalculate;
#[cfg(feature = "std")]
mod split;

pub use position::Position;
pub use queue::BlockQueue;
pub use recalculate::{forward_pass, max_allowable_speed, recalculate, recalculate_trapezoids, reverse_pass};
#[cfg(feature = "std")]
pub use split::{Consumer, Producer};

use libm::{ceilf, fabsf, roundf, sqrtf};

use crate::config::{
    validate_config, AdvanceConfig, Axis, MachineLimits, PlannerConfig, StepsPerMm, NUM_AXIS,
};
use crate::error::{PlannerError, Result};
use crate::motion::{Block, JunctionLimits, MoveVelocity, PressureAdvance, TrapezoidGenerator};

/// Default number of queue slots (one stays unused).
pub const DEFAULT_BLOCK_BUFFER_SIZE: usize = 32;

/// Outcome of queueing a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Planned {
    /// A block was added to the queue.
    Queued,
    /// The move had too few step events and was skipped.
    Dropped,
}

/// Look-ahead planner over a ring of `N` block slots.
#[derive(Debug, Clone)]
pub struct Planner<const N: usize = DEFAULT_BLOCK_BUFFER_SIZE> {
    config: PlannerConfig,
    limits: MachineLimits,
    junction: JunctionLimits,
    generator: TrapezoidGenerator,
    queue: BlockQueue<N>,
    position: Position,
    previous: Option<MoveVelocity>,
}

impl<const N: usize> Planner<N> {
    /// Create a planner at position zero with an empty queue.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: PlannerConfig) -> Result<Self> {
        validate_config(&config)?;

        let planner = Self {
            config,
            limits: MachineLimits::from_config(&config),
            junction: JunctionLimits::from_config(&config.motion),
            generator: Self::generator_for(&config),
            queue: BlockQueue::new(),
            position: Position::default(),
            previous: None,
        };
        info!("planner ready: {} block slots", planner.queue.capacity());
        Ok(planner)
    }

    fn generator_for(config: &PlannerConfig) -> TrapezoidGenerator {
        TrapezoidGenerator::new(
            config.motion.minimum_step_rate,
            PressureAdvance::from_config(config),
        )
    }

    /// Reset the planner and enable pressure advance.
    ///
    /// Empties the queue, zeroes the position and forgets the previous move.
    pub fn initialize(&mut self, advance_k: f32, filament_diameter: f32, e_steps_per_mm: f32) -> Result<()> {
        let mut config = self.config;
        config.advance = Some(AdvanceConfig::new(advance_k, filament_diameter));
        config.axes.get_mut(Axis::E).steps_per_mm = StepsPerMm(e_steps_per_mm);
        self.reconfigure(config)?;

        self.queue = BlockQueue::new();
        self.position = Position::default();
        self.previous = None;
        info!("planner initialized: advance k {} filament {} mm", advance_k, filament_diameter);
        Ok(())
    }

    /// Install a new configuration. Queued blocks keep their plan.
    pub fn reconfigure(&mut self, config: PlannerConfig) -> Result<()> {
        validate_config(&config)?;

        self.config = config;
        self.limits = MachineLimits::from_config(&config);
        self.junction = JunctionLimits::from_config(&config.motion);
        self.generator = Self::generator_for(&config);
        info!("planner reconfigured");
        Ok(())
    }

    /// The active configuration.
    #[inline]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Limits derived from the active configuration.
    #[inline]
    pub fn limits(&self) -> &MachineLimits {
        &self.limits
    }

    /// Last planned position.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Maximum number of queued blocks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Queue a linear move to `target` at `feed_rate` mm/s.
    ///
    /// Moves with no more than `drop_segments` step events are dropped
    /// without touching the tracked position. A full queue is reported as
    /// [`PlannerError::QueueFull`] and leaves the planner unchanged, as does a
    /// feed rate that is not positive after the configured floors.
    pub fn buffer_line(&mut self, target: Position, feed_rate: f32, extruder: u8) -> Result<Planned> {
        let motion = self.config.motion;
        let delta = self.position.delta_to(&target);
        let mut block = Block::from_delta(delta, extruder);

        if block.step_event_count <= motion.drop_segments {
            debug!("dropped move of {} step events", block.step_event_count);
            return Ok(Planned::Dropped);
        }

        if self.queue.is_full() {
            return Err(PlannerError::QueueFull {
                capacity: self.queue.capacity(),
            }
            .into());
        }

        let extruder_only = block.is_extruder_only(motion.drop_segments);
        let feed_floor = if delta[Axis::E.index()] == 0 {
            motion.min_travel_feedrate.0
        } else {
            motion.minimum_feedrate.0
        };
        let feed_rate = feed_rate.max(feed_floor);
        if !feed_rate.is_finite() || feed_rate <= 0.0 {
            return Err(PlannerError::InvalidFeedRate(feed_rate).into());
        }

        let delta_mm = self.limits.delta_mm(&delta);
        block.millimeters = if extruder_only {
            fabsf(delta_mm[Axis::E.index()])
        } else {
            let [x, y, z, _] = delta_mm;
            sqrtf(x * x + y * y + z * z)
        };

        let inverse_millimeters = 1.0 / block.millimeters;
        let inverse_second = self.slow_down(feed_rate * inverse_millimeters);

        let mut speeds = [0.0f32; NUM_AXIS];
        for (speed, mm) in speeds.iter_mut().zip(delta_mm.iter()) {
            *speed = mm * inverse_second;
        }
        block.nominal_speed = block.millimeters * inverse_second;
        block.nominal_rate = ceilf(block.step_event_count as f32 * inverse_second) as u32;

        let factor = self.limits.feedrate_factor(&speeds);
        if factor < 1.0 {
            for speed in speeds.iter_mut() {
                *speed *= factor;
            }
            block.nominal_speed *= factor;
            block.nominal_rate = (block.nominal_rate as f32 * factor) as u32;
        }

        let steps_per_mm = block.step_event_count as f32 * inverse_millimeters;
        let acceleration = if extruder_only {
            motion.retract_acceleration.0
        } else {
            motion.acceleration.0
        };
        let acceleration_st = ceilf(StepsPerMm(steps_per_mm).to_steps_rate(acceleration)) as u32;
        block.acceleration_st =
            self.limits
                .limit_acceleration(acceleration_st, &block.abs_steps(), block.step_event_count);
        block.acceleration = block.acceleration_st as f32 / steps_per_mm;

        let current = MoveVelocity::new(speeds, block.nominal_speed);
        let previous = if self.queue.is_empty() {
            None
        } else {
            self.previous.as_ref()
        };
        let stop_speed = max_allowable_speed(&block, 0.0);

        block.max_entry_speed = self
            .junction
            .junction_speed(previous, &current)
            .min(block.nominal_speed);
        block.entry_speed = block.max_entry_speed.min(stop_speed);
        // A busy predecessor already committed to its exit speed
        if let Some(newest) = self.queue.newest().filter(|b| b.busy) {
            block.entry_speed = newest.exit_speed.min(block.nominal_speed);
            block.max_entry_speed = block.max_entry_speed.max(block.entry_speed);
        }
        block.nominal_length_flag = block.nominal_speed <= stop_speed;
        block.recalculate_flag = true;

        if let Some(advance) = self.generator.advance() {
            advance.plan_block(&mut block, speeds[Axis::E.index()], motion.drop_segments);
        }
        self.generator.generate(&mut block, 0.0);

        self.queue.push(block)?;
        self.previous = Some(current);
        self.position = target;

        debug!(
            "queued block: {} step events, {} mm at {} mm/s, entry {}",
            block.step_event_count,
            block.millimeters,
            block.nominal_speed,
            block.entry_speed
        );

        recalculate(&mut self.queue, &self.generator);
        Ok(Planned::Queued)
    }

    /// Stretch short moves while few blocks are queued so the queue does not
    /// run dry. Returns the adjusted inverse duration in 1/s.
    fn slow_down(&self, inverse_second: f32) -> f32 {
        let min_segment_time = self.config.motion.min_segment_time_us as f32;
        let moves_queued = self.queue.len();

        if min_segment_time <= 0.0 || moves_queued <= 1 || moves_queued >= N / 2 {
            return inverse_second;
        }

        let segment_time = roundf(1_000_000.0 / inverse_second);
        if segment_time >= min_segment_time {
            return inverse_second;
        }

        let stretch = roundf(2.0 * (min_segment_time - segment_time) / moves_queued as f32);
        1_000_000.0 / (segment_time + stretch)
    }

    /// Redefine the current position without moving.
    ///
    /// The next move starts from rest.
    pub fn set_position(&mut self, x: i32, y: i32, z: i32, e: i32) {
        self.position = Position::new(x, y, z, e);
        self.previous = None;
        debug!("position set to {} {} {} {}", x, y, z, e);
    }

    /// Redefine the extruder position without moving.
    pub fn set_extruder_position(&mut self, e: i32) {
        self.position.set_axis(Axis::E, e);
        debug!("extruder position set to {}", e);
    }

    /// Number of queued blocks, including the one executing.
    #[inline]
    pub fn queued_move_count(&self) -> usize {
        self.queue.len()
    }

    /// Queued block at `position` from the oldest.
    #[inline]
    pub fn block(&self, position: usize) -> Option<&Block> {
        self.queue.get(position)
    }

    /// Queued blocks from oldest to newest.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.queue.iter()
    }

    /// Drop all queued blocks except one being executed.
    ///
    /// The next move joins the kept block at the speed it was executed to end at.
    pub fn flush(&mut self) {
        self.queue.flush();
        let kept = self.queue.newest().copied();
        self.previous = kept.map(|block| self.velocity_of(&block));
        debug!("queue flushed, {} block(s) kept", self.queue.len());
    }

    /// The oldest block, marked busy. Look-ahead no longer touches it.
    #[inline]
    pub fn current_block(&mut self) -> Option<&Block> {
        self.queue.peek_head()
    }

    /// Release the oldest block once it has been executed.
    #[inline]
    pub fn discard_current_block(&mut self) {
        self.queue.discard_head();
    }

    /// Whether any block is queued.
    #[inline]
    pub fn has_queued_blocks(&self) -> bool {
        !self.queue.is_empty()
    }

    fn velocity_of(&self, block: &Block) -> MoveVelocity {
        let delta_mm = self.limits.delta_mm(&block.delta_steps);
        let scale = block.nominal_speed / block.millimeters;
        let mut speeds = [0.0f32; NUM_AXIS];
        for (speed, mm) in speeds.iter_mut().zip(delta_mm.iter()) {
            *speed = mm * scale;
        }
        MoveVelocity::new(speeds, block.nominal_speed)
    }

    #[cfg(feature = "std")]
    pub(crate) fn queue(&self) -> &BlockQueue<N> {
        &self.queue
    }

    /// Take over the executing copy of the oldest block and pin the entry of
    /// the block after it to that copy's exit speed.
    #[cfg(feature = "std")]
    pub(crate) fn adopt_busy_head(&mut self, block: Block) {
        let Some(head) = self.queue.get_mut(0) else {
            return;
        };
        *head = block;

        if let Some(next) = self.queue.get_mut(1) {
            next.entry_speed = block.exit_speed;
            next.recalculate_flag = true;
        }
        recalculate(&mut self.queue, &self.generator);
    }

    /// Pin the entry of the oldest block to the exit speed its executed
    /// predecessor ended at.
    #[cfg(feature = "std")]
    pub(crate) fn pin_head_entry(&mut self, entry_speed: f32) {
        let Some(head) = self.queue.get_mut(0).filter(|b| !b.busy) else {
            return;
        };
        if head.entry_speed != entry_speed {
            trace!("head entry pinned {} -> {}", head.entry_speed, entry_speed);
            head.entry_speed = entry_speed;
            head.recalculate_flag = true;
            recalculate(&mut self.queue, &self.generator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxesConfig, AxisConfig, MmPerSec, MmPerSecSquared};
    use crate::error::Error;

    fn test_config() -> PlannerConfig {
        let mut config = PlannerConfig::new(AxesConfig {
            x: AxisConfig::new(100.0, 200.0, 5000.0),
            y: AxisConfig::new(100.0, 200.0, 5000.0),
            z: AxisConfig::new(400.0, 5.0, 100.0),
            e: AxisConfig::new(100.0, 50.0, 10000.0),
        });
        config.motion.acceleration = MmPerSecSquared(500.0);
        config.motion.retract_acceleration = MmPerSecSquared(1000.0);
        config
    }

    fn planner() -> Planner<8> {
        Planner::new(test_config()).unwrap()
    }

    #[test]
    fn test_single_move_profile() {
        let mut p = planner();
        assert_eq!(p.buffer_line(Position::new(1000, 0, 0, 0), 10.0, 0), Ok(Planned::Queued));

        let b = p.block(0).unwrap();
        assert_eq!(b.step_event_count, 1000);
        assert_eq!(b.nominal_rate, 1000);
        assert_eq!(b.acceleration_st, 50_000);
        assert_eq!(b.entry_speed, 0.0);
        assert_eq!(b.final_rate, 0);
        assert_eq!(b.accelerate_until, 10);
        assert_eq!(b.decelerate_after, 990);
        assert!(b.nominal_length_flag);
        assert_eq!(p.position(), Position::new(1000, 0, 0, 0));
    }

    #[test]
    fn test_degenerate_move_dropped() {
        let mut p = planner();
        assert_eq!(p.buffer_line(Position::default(), 10.0, 0), Ok(Planned::Dropped));
        assert_eq!(p.queued_move_count(), 0);
    }

    #[test]
    fn test_drop_segments_keeps_position() {
        let mut config = test_config();
        config.motion.drop_segments = 5;
        let mut p = Planner::<8>::new(config).unwrap();

        assert_eq!(p.buffer_line(Position::new(3, 0, 0, 0), 10.0, 0), Ok(Planned::Dropped));
        assert_eq!(p.position(), Position::default());

        // The small move folds into the next one
        assert_eq!(p.buffer_line(Position::new(6, 0, 0, 0), 10.0, 0), Ok(Planned::Queued));
        assert_eq!(p.block(0).unwrap().delta_steps, [6, 0, 0, 0]);
    }

    #[test]
    fn test_queue_full_leaves_state() {
        let mut p = planner();
        for i in 1..=7 {
            p.buffer_line(Position::new(i * 100, 0, 0, 0), 50.0, 0).unwrap();
        }
        let position = p.position();

        assert_eq!(
            p.buffer_line(Position::new(800, 0, 0, 0), 50.0, 0),
            Err(Error::Planner(PlannerError::QueueFull { capacity: 7 }))
        );
        assert_eq!(p.position(), position);
        assert_eq!(p.queued_move_count(), 7);
    }

    #[test]
    fn test_extruder_only_move() {
        let mut p = planner();
        p.buffer_line(Position::new(0, 0, 0, -400), 40.0, 0).unwrap();

        let b = p.block(0).unwrap();
        assert!((b.millimeters - 4.0).abs() < 1e-5);
        assert!((b.nominal_speed - 40.0).abs() < 1e-3);
        // Retract acceleration at 100 steps/mm
        assert_eq!(b.acceleration_st, 100_000);
        assert!(b.is_negative(Axis::E));
    }

    #[test]
    fn test_feedrate_floor() {
        let mut config = test_config();
        config.motion.min_travel_feedrate = MmPerSec(20.0);
        let mut p = Planner::<8>::new(config).unwrap();

        p.buffer_line(Position::new(1000, 0, 0, 0), 5.0, 0).unwrap();
        assert!((p.block(0).unwrap().nominal_speed - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_axis_feedrate_scaling() {
        let mut p = planner();
        // Z is limited to 5 mm/s
        p.buffer_line(Position::new(0, 0, 400, 0), 50.0, 0).unwrap();

        let b = p.block(0).unwrap();
        assert!((b.nominal_speed - 5.0).abs() < 1e-3);
        assert_eq!(b.nominal_rate, 2000);
    }

    #[test]
    fn test_axis_acceleration_limit() {
        let mut p = planner();
        p.buffer_line(Position::new(0, 0, 400, 0), 5.0, 0).unwrap();

        // Z max 100 mm/s² at 400 steps/mm
        let b = p.block(0).unwrap();
        assert_eq!(b.acceleration_st, 40_000);
        assert!((b.acceleration - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_set_position_restarts_from_rest() {
        let mut p = planner();
        p.buffer_line(Position::new(1000, 0, 0, 0), 50.0, 0).unwrap();
        p.set_position(1000, 0, 0, 0);
        p.buffer_line(Position::new(2000, 0, 0, 0), 50.0, 0).unwrap();

        assert_eq!(p.block(1).unwrap().max_entry_speed, 0.0);

        p.set_extruder_position(-20);
        assert_eq!(p.position(), Position::new(2000, 0, 0, -20));
    }

    #[test]
    fn test_consumer_cycle() {
        let mut p = planner();
        p.buffer_line(Position::new(1000, 0, 0, 0), 50.0, 0).unwrap();
        p.buffer_line(Position::new(2000, 0, 0, 0), 50.0, 0).unwrap();

        assert!(p.has_queued_blocks());
        assert!(p.current_block().unwrap().busy);
        p.discard_current_block();
        assert_eq!(p.queued_move_count(), 1);
        p.discard_current_block();
        assert!(!p.has_queued_blocks());
        assert!(p.current_block().is_none());
    }

    #[test]
    fn test_append_after_busy_tail_starts_from_its_exit() {
        let mut p = planner();
        p.buffer_line(Position::new(1000, 0, 0, 0), 50.0, 0).unwrap();
        let committed_exit = p.current_block().unwrap().exit_speed;
        p.buffer_line(Position::new(2000, 0, 0, 0), 50.0, 0).unwrap();

        assert_eq!(committed_exit, 0.0);
        assert_eq!(p.block(1).unwrap().entry_speed, 0.0);
        assert_eq!(p.block(0).unwrap().exit_speed, 0.0);
    }

    #[test]
    fn test_flush() {
        let mut p = planner();
        for i in 1..=4 {
            p.buffer_line(Position::new(i * 1000, 0, 0, 0), 50.0, 0).unwrap();
        }
        p.current_block();
        p.flush();

        assert_eq!(p.queued_move_count(), 1);
        assert!(p.block(0).unwrap().busy);
    }

    #[test]
    fn test_flush_joins_running_block_at_its_exit() {
        let mut p = planner();
        for i in 1..=3 {
            p.buffer_line(Position::new(i * 8000, 0, 0, 0), 100.0, 0).unwrap();
        }
        let running = *p.current_block().unwrap();
        assert_eq!(running.exit_speed, 100.0);

        p.flush();
        p.buffer_line(Position::new(32_000, 0, 0, 0), 100.0, 0).unwrap();

        let next = p.block(1).unwrap();
        assert_eq!(next.entry_speed, running.exit_speed);
        assert_eq!(next.max_entry_speed, 100.0);
        assert_eq!(next.initial_rate, running.final_rate);
    }

    #[test]
    fn test_rejects_non_positive_feed_rate() {
        let mut p = planner();
        for feed_rate in [0.0, -5.0, f32::NAN] {
            let result = p.buffer_line(Position::new(1000, 0, 0, 0), feed_rate, 0);
            assert!(matches!(result, Err(Error::Planner(PlannerError::InvalidFeedRate(_)))));
        }
        assert_eq!(p.queued_move_count(), 0);
        assert_eq!(p.position(), Position::default());

        // A floor turns a zero request into a usable move
        let mut config = test_config();
        config.motion.min_travel_feedrate = MmPerSec(20.0);
        let mut p = Planner::<8>::new(config).unwrap();
        assert_eq!(p.buffer_line(Position::new(1000, 0, 0, 0), 0.0, 0), Ok(Planned::Queued));
        assert!(p.block(0).unwrap().nominal_rate > 0);
    }

    #[test]
    fn test_initialize_enables_advance() {
        let mut p = planner();
        p.buffer_line(Position::new(1000, 0, 0, 0), 50.0, 0).unwrap();
        p.initialize(0.05, 1.75, 100.0).unwrap();

        assert_eq!(p.queued_move_count(), 0);
        assert_eq!(p.position(), Position::default());

        p.buffer_line(Position::new(1000, 0, 0, 50), 20.0, 0).unwrap();
        let b = p.block(0).unwrap();
        assert!(b.advance > 0.0);
        assert_eq!(b.initial_advance, 0);

        assert!(p.initialize(0.05, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.axes.x.steps_per_mm = StepsPerMm(0.0);
        assert!(Planner::<8>::new(config).is_err());
    }

    #[test]
    fn test_slowdown_stretches_short_moves() {
        let mut config = test_config();
        config.motion.min_segment_time_us = 20_000;
        let mut p = Planner::<16>::new(config).unwrap();

        // 1 mm at 100 mm/s takes 10 ms
        for i in 1..=3 {
            p.buffer_line(Position::new(i * 100, 0, 0, 0), 100.0, 0).unwrap();
        }
        let first = p.block(0).unwrap().nominal_speed;
        let second = p.block(1).unwrap().nominal_speed;
        let third = p.block(2).unwrap().nominal_speed;

        assert!((first - 100.0).abs() < 1e-2);
        assert!((second - 100.0).abs() < 1e-2);
        // Two queued: 10 ms + 2·10 ms / 2 = 20 ms
        assert!((third - 50.0).abs() < 1e-2, "{}", third);
    }
}
