//! Producer and consumer handles over a shared block ring.
//!
//! The producer owns a private copy of the planner and runs every look-ahead
//! sweep on it without holding any lock. Finished plans are copied into the
//! shared slots oldest to newest, each slot locked only while it is written
//! and released only once the next one is held, so the consumer never sees a
//! block whose entry speed disagrees with the exit speed of the block it just
//! ran. `head` is advanced last.
//!
//! The consumer marks the tail slot busy when it starts a block. If that
//! happens behind the producer's back, the producer adopts the consumer's
//! copy, pins the next entry speed to its exit speed and replans. A block
//! the consumer has already finished stays in its slot until the producer
//! catches up, so its exit speed pins the block after it the same way.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;

use super::queue::BlockQueue;
use super::{Planned, Planner, Position};
use crate::error::{Error, PlannerError, Result};
use crate::motion::Block;

/// Back-off between retries on a full queue, in microseconds.
const BACKOFF_US: u32 = 100;

struct SharedQueue<const N: usize> {
    slots: [Mutex<Block>; N],
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl<const N: usize> SharedQueue<N> {
    fn lock(&self, index: usize) -> MutexGuard<'_, Block> {
        self.slots[index].lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & (N - 1)
    }
}

enum Publish {
    Done,
    Stale,
}

/// Producer side: plans moves and publishes them.
pub struct Producer<const N: usize> {
    planner: Planner<N>,
    shared: Arc<SharedQueue<N>>,
}

/// Consumer side: takes blocks for execution in FIFO order.
pub struct Consumer<const N: usize> {
    shared: Arc<SharedQueue<N>>,
}

impl<const N: usize> Planner<N> {
    /// Split into a producer and a consumer handle for two threads.
    ///
    /// Blocks already queued are carried over.
    pub fn split(self) -> (Producer<N>, Consumer<N>) {
        let queue = self.queue();
        let mut slots: [Mutex<Block>; N] = core::array::from_fn(|_| Mutex::new(Block::default()));
        let mut index = queue.tail_index();
        for block in queue.iter() {
            if let Ok(slot) = slots[index].get_mut() {
                *slot = *block;
            }
            index = BlockQueue::<N>::next_index(index);
        }

        let shared = Arc::new(SharedQueue {
            slots,
            head: AtomicUsize::new(queue.head_index()),
            tail: AtomicUsize::new(queue.tail_index()),
        });

        (
            Producer {
                planner: self,
                shared: Arc::clone(&shared),
            },
            Consumer { shared },
        )
    }
}

impl<const N: usize> Producer<N> {
    /// Queue a linear move, yielding the thread while the queue is full.
    pub fn buffer_line(&mut self, target: Position, feed_rate: f32, extruder: u8) -> Result<Planned> {
        self.buffer_line_with(target, feed_rate, extruder, std::thread::yield_now)
    }

    /// Queue a linear move, backing off through `delay` while the queue is full.
    pub fn buffer_line_with_delay<D: DelayNs>(
        &mut self,
        target: Position,
        feed_rate: f32,
        extruder: u8,
        delay: &mut D,
    ) -> Result<Planned> {
        self.buffer_line_with(target, feed_rate, extruder, || delay.delay_us(BACKOFF_US))
    }

    fn buffer_line_with(
        &mut self,
        target: Position,
        feed_rate: f32,
        extruder: u8,
        mut back_off: impl FnMut(),
    ) -> Result<Planned> {
        let mut warned = false;
        loop {
            match self.try_buffer_line(target, feed_rate, extruder) {
                Err(Error::Planner(PlannerError::QueueFull { capacity })) => {
                    if !warned {
                        warn!("block queue full ({} blocks), waiting for the consumer", capacity);
                        warned = true;
                    }
                    back_off();
                }
                other => return other,
            }
        }
    }

    /// Queue a linear move or report [`PlannerError::QueueFull`] at once.
    pub fn try_buffer_line(&mut self, target: Position, feed_rate: f32, extruder: u8) -> Result<Planned> {
        self.sync();
        let planned = self.planner.buffer_line(target, feed_rate, extruder)?;
        if planned == Planned::Queued {
            while let Publish::Stale = self.publish() {
                self.sync();
            }
        }
        Ok(planned)
    }

    /// Redefine the current position without moving.
    pub fn set_position(&mut self, x: i32, y: i32, z: i32, e: i32) {
        self.planner.set_position(x, y, z, e);
    }

    /// Redefine the extruder position without moving.
    pub fn set_extruder_position(&mut self, e: i32) {
        self.planner.set_extruder_position(e);
    }

    /// Last planned position.
    pub fn position(&self) -> Position {
        self.planner.position()
    }

    /// Number of queued blocks, including the one executing.
    pub fn queued_move_count(&self) -> usize {
        self.shared.len()
    }

    /// Drop every queued block the consumer has not started.
    ///
    /// A busy block stays queued until the consumer discards it.
    pub fn abort(&mut self) {
        loop {
            let tail = self.shared.tail.load(Ordering::Acquire);
            let slot = self.shared.lock(tail);
            if self.shared.tail.load(Ordering::Acquire) != tail {
                continue;
            }

            let head = if slot.busy {
                BlockQueue::<N>::next_index(tail)
            } else {
                tail
            };
            self.shared.head.store(head, Ordering::Release);
            break;
        }

        self.sync();
        self.planner.flush();
    }

    /// Bring the private plan in line with what the consumer has done.
    fn sync(&mut self) {
        let tail = self.shared.tail.load(Ordering::Acquire);
        let mut executed = false;
        while self.planner.has_queued_blocks() && self.planner.queue().tail_index() != tail {
            self.planner.discard_current_block();
            executed = true;
        }

        let Some(local) = self.planner.block(0).copied() else {
            return;
        };
        let shared = *self.shared.lock(tail);
        if shared.busy && !local.busy {
            self.planner.adopt_busy_head(shared);
        } else if executed {
            // Slot behind the tail is not rewritten until the tail moves on
            let exit_speed = self.shared.lock(BlockQueue::<N>::prev_index(tail)).exit_speed;
            self.planner.pin_head_entry(exit_speed);
        }
    }

    /// Copy the private plan into the shared slots.
    fn publish(&self) -> Publish {
        let shared = &*self.shared;
        let queue = self.planner.queue();
        let tail = queue.tail_index();

        let mut slot = shared.lock(tail);
        let local_busy = queue.get(0).map_or(false, |b| b.busy);
        if shared.tail.load(Ordering::Acquire) != tail || (slot.busy && !local_busy) {
            return Publish::Stale;
        }

        let mut index = tail;
        for (position, block) in queue.iter().enumerate() {
            if position > 0 {
                slot = shared.lock(index);
            }
            if !slot.busy {
                *slot = *block;
            }
            index = BlockQueue::<N>::next_index(index);
        }
        drop(slot);

        shared.head.store(queue.head_index(), Ordering::Release);
        Publish::Done
    }
}

impl<const N: usize> Consumer<N> {
    /// Copy of the oldest block, marked busy. `None` when nothing is queued.
    pub fn current_block(&mut self) -> Option<Block> {
        let tail = self.shared.tail.load(Ordering::Acquire);
        if self.shared.head.load(Ordering::Acquire) == tail {
            return None;
        }

        let mut slot = self.shared.lock(tail);
        // Recheck under the lock, an abort may have emptied the queue
        if self.shared.head.load(Ordering::Acquire) == tail {
            return None;
        }
        slot.busy = true;
        Some(*slot)
    }

    /// Release the oldest block once it has been executed.
    pub fn discard_current_block(&mut self) {
        let tail = self.shared.tail.load(Ordering::Acquire);
        if self.shared.head.load(Ordering::Acquire) == tail {
            return;
        }

        let mut slot = self.shared.lock(tail);
        slot.busy = false;
        self.shared
            .tail
            .store(BlockQueue::<N>::next_index(tail), Ordering::Release);
    }

    /// Whether any block is queued.
    pub fn has_queued_blocks(&self) -> bool {
        self.shared.head.load(Ordering::Acquire) != self.shared.tail.load(Ordering::Acquire)
    }
}
