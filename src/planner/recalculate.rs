//! Look-ahead recalculation over the queued blocks.
//!
//! After every enqueue the engine sweeps newest to oldest (how fast may each
//! block be entered so the machine can still stop at the end of the queue),
//! then oldest to newest (how fast can each block actually be entered given
//! the acceleration available in the block before it), and finally
//! regenerates the trapezoids whose entry or exit speed moved.
//!
//! The oldest block whose predecessor is busy or already executed is the
//! anchor: its entry speed was committed as that predecessor's exit speed and
//! is never changed. Busy blocks are never touched.

use libm::sqrtf;

use super::queue::BlockQueue;
use crate::motion::{Block, TrapezoidGenerator};

/// Highest speed at the start of `block` from which it can still slow down to
/// `exit_speed` (or reach it, going forward) over its length.
#[inline]
pub fn max_allowable_speed(block: &Block, exit_speed: f32) -> f32 {
    sqrtf(exit_speed * exit_speed + 2.0 * block.acceleration * block.millimeters)
}

/// Position of the block whose entry speed is pinned.
fn anchor<const N: usize>(queue: &BlockQueue<N>) -> usize {
    match queue.get(0) {
        Some(block) if block.busy => 1,
        _ => 0,
    }
}

/// Run a full reverse, forward and trapezoid pass.
pub fn recalculate<const N: usize>(queue: &mut BlockQueue<N>, generator: &TrapezoidGenerator) {
    reverse_pass(queue);
    forward_pass(queue);
    recalculate_trapezoids(queue, generator);
}

/// Lower or raise entry speeds so every block can decelerate into the next.
///
/// The newest block must be able to stop.
pub fn reverse_pass<const N: usize>(queue: &mut BlockQueue<N>) {
    let anchor = anchor(queue);
    let mut next_entry = 0.0f32;

    for position in (anchor + 1..queue.len()).rev() {
        let Some(block) = queue.get_mut(position) else {
            break;
        };

        let candidate = if block.nominal_length_flag {
            block.max_entry_speed
        } else {
            block.max_entry_speed.min(max_allowable_speed(block, next_entry))
        };

        if candidate != block.entry_speed {
            trace!("reverse pass: block {} entry {} -> {}", position, block.entry_speed, candidate);
            block.entry_speed = candidate;
            block.recalculate_flag = true;
        }
        next_entry = block.entry_speed;
    }
}

/// Cap entry speeds at what the previous block can accelerate to.
pub fn forward_pass<const N: usize>(queue: &mut BlockQueue<N>) {
    let anchor = anchor(queue);
    let Some(first) = queue.get(anchor) else {
        return;
    };
    let mut previous = *first;

    for position in anchor + 1..queue.len() {
        let Some(block) = queue.get_mut(position) else {
            break;
        };

        let reachable = max_allowable_speed(&previous, previous.entry_speed);
        if block.entry_speed > reachable {
            trace!("forward pass: block {} entry {} -> {}", position, block.entry_speed, reachable);
            block.entry_speed = reachable;
            block.recalculate_flag = true;
        }
        previous = *block;
    }
}

/// Regenerate trapezoids of blocks whose entry or exit speed changed.
///
/// The newest block is always regenerated with a stop at its end.
pub fn recalculate_trapezoids<const N: usize>(queue: &mut BlockQueue<N>, generator: &TrapezoidGenerator) {
    let len = queue.len();

    for position in 0..len {
        let (next_entry, next_flag) = match queue.get(position + 1) {
            Some(next) => (next.entry_speed, next.recalculate_flag),
            None => (0.0, true),
        };

        let Some(block) = queue.get_mut(position) else {
            break;
        };
        if block.busy {
            continue;
        }

        if block.recalculate_flag || next_flag {
            generator.generate(block, next_entry);
            block.recalculate_flag = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 mm block at 100 steps/mm, 500 mm/s², with the given speeds.
    fn block(nominal_speed: f32, max_entry_speed: f32) -> Block {
        let mut b = Block::from_delta([1000, 0, 0, 0], 0);
        b.millimeters = 10.0;
        b.acceleration = 500.0;
        b.acceleration_st = 50_000;
        b.nominal_speed = nominal_speed;
        b.nominal_rate = (nominal_speed * 100.0) as u32;
        b.max_entry_speed = max_entry_speed;
        b.recalculate_flag = true;
        b
    }

    fn queue_of(blocks: &[Block]) -> BlockQueue<8> {
        let mut queue = BlockQueue::new();
        for b in blocks {
            queue.push(*b).unwrap();
        }
        queue
    }

    #[test]
    fn test_max_allowable_speed() {
        let b = block(100.0, 0.0);
        // sqrt(2 · 500 · 10)
        assert!((max_allowable_speed(&b, 0.0) - 100.0).abs() < 1e-3);
        assert!((max_allowable_speed(&b, 100.0) - sqrtf(20_000.0)).abs() < 1e-2);
    }

    #[test]
    fn test_anchor_entry_pinned() {
        let mut queue = queue_of(&[block(50.0, 0.0), block(50.0, 50.0)]);
        recalculate(&mut queue, &TrapezoidGenerator::default());

        let first = queue.get(0).unwrap();
        let second = queue.get(1).unwrap();
        assert_eq!(first.entry_speed, 0.0);
        // Newest must stop within 10 mm: at most 100 mm/s, junction allows 50
        assert_eq!(second.entry_speed, 50.0);
        assert_eq!(first.exit_speed, 50.0);
        assert_eq!(second.exit_speed, 0.0);
        assert!(!first.recalculate_flag && !second.recalculate_flag);
    }

    #[test]
    fn test_reverse_limits_by_stopping_distance() {
        let mut queue = queue_of(&[block(200.0, 0.0), block(200.0, 200.0)]);
        reverse_pass(&mut queue);

        let second = queue.get(1).unwrap();
        assert!((second.entry_speed - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_forward_limits_by_acceleration() {
        let mut queue = queue_of(&[
            block(200.0, 0.0),
            block(200.0, 200.0),
            block(200.0, 200.0),
            block(200.0, 200.0),
        ]);
        recalculate(&mut queue, &TrapezoidGenerator::default());

        let entries: [f32; 4] = core::array::from_fn(|i| queue.get(i).unwrap().entry_speed);
        // From rest, 10 mm at 500 mm/s² reaches 100 mm/s
        assert_eq!(entries[0], 0.0);
        assert!((entries[1] - 100.0).abs() < 1e-3, "{:?}", entries);
        // Two blocks of stopping distance left, and two of run-up behind
        assert!((entries[2] - sqrtf(20_000.0)).abs() < 1e-2, "{:?}", entries);
        assert!((entries[3] - 100.0).abs() < 1e-3, "{:?}", entries);
    }

    #[test]
    fn test_busy_block_untouched() {
        let mut queue = queue_of(&[block(50.0, 0.0), block(50.0, 50.0), block(50.0, 50.0)]);
        recalculate(&mut queue, &TrapezoidGenerator::default());

        let busy = *queue.peek_head().unwrap();
        let pinned_entry = queue.get(1).unwrap().entry_speed;

        // Shrink what the last block allows; the busy block and its successor keep their plan
        queue.get_mut(2).unwrap().max_entry_speed = 0.0;
        queue.get_mut(2).unwrap().recalculate_flag = true;
        recalculate(&mut queue, &TrapezoidGenerator::default());

        assert_eq!(*queue.get(0).unwrap(), busy);
        assert_eq!(queue.get(1).unwrap().entry_speed, pinned_entry);
        assert_eq!(queue.get(2).unwrap().entry_speed, 0.0);
        assert_eq!(queue.get(1).unwrap().exit_speed, 0.0);
    }

    #[test]
    fn test_trapezoids_bounded() {
        let mut queue = queue_of(&[block(80.0, 0.0), block(80.0, 40.0), block(30.0, 30.0)]);
        recalculate(&mut queue, &TrapezoidGenerator::default());

        for b in queue.iter() {
            assert!(b.accelerate_until <= b.decelerate_after);
            assert!(b.decelerate_after <= b.step_event_count);
            assert!(b.entry_speed <= b.max_entry_speed || b.entry_speed == 0.0);
        }
    }
}
