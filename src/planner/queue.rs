//! Fixed-capacity block ring buffer.

use crate::error::{PlannerError, Result};
use crate::motion::Block;

/// Circular FIFO of blocks with `N` slots.
///
/// `N` must be a power of two; one slot stays unused so `head == tail`
/// always means empty. Positions passed to [`get`](Self::get) are relative
/// to the oldest block (0 = tail).
#[derive(Debug, Clone)]
pub struct BlockQueue<const N: usize> {
    blocks: [Block; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> BlockQueue<N> {
    const VALID_CAPACITY: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "block queue size must be a power of two >= 2"
    );

    const MASK: usize = N - 1;

    /// Create an empty queue.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CAPACITY;
        Self {
            blocks: [Block::default(); N],
            head: 0,
            tail: 0,
        }
    }

    /// Slot index following `index`.
    #[inline]
    pub const fn next_index(index: usize) -> usize {
        (index + 1) & Self::MASK
    }

    /// Ring index before `index`.
    #[inline]
    pub const fn prev_index(index: usize) -> usize {
        index.wrapping_sub(1) & Self::MASK
    }

    /// Number of blocks the queue can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of queued blocks, including a busy one.
    #[inline]
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) & Self::MASK
    }

    /// Whether no block is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Whether no slot is free.
    #[inline]
    pub fn is_full(&self) -> bool {
        Self::next_index(self.head) == self.tail
    }

    /// Slot index of the next write.
    #[inline]
    pub fn head_index(&self) -> usize {
        self.head
    }

    /// Slot index of the oldest block.
    #[inline]
    pub fn tail_index(&self) -> usize {
        self.tail
    }

    /// Append a block.
    pub fn push(&mut self, block: Block) -> Result<()> {
        if self.is_full() {
            return Err(PlannerError::QueueFull {
                capacity: self.capacity(),
            }
            .into());
        }
        self.blocks[self.head] = block;
        self.head = Self::next_index(self.head);
        Ok(())
    }

    /// The oldest block, marked busy so look-ahead leaves it alone.
    pub fn peek_head(&mut self) -> Option<&Block> {
        if self.is_empty() {
            return None;
        }
        let block = &mut self.blocks[self.tail];
        block.busy = true;
        Some(block)
    }

    /// Drop the oldest block. No-op when empty.
    pub fn discard_head(&mut self) {
        if !self.is_empty() {
            self.blocks[self.tail].busy = false;
            self.tail = Self::next_index(self.tail);
        }
    }

    /// Drop every block except one that is busy.
    pub fn flush(&mut self) {
        self.head = match self.get(0) {
            Some(block) if block.busy => Self::next_index(self.tail),
            _ => self.tail,
        };
    }

    /// Block at `position` from the oldest.
    #[inline]
    pub fn get(&self, position: usize) -> Option<&Block> {
        (position < self.len()).then(|| &self.blocks[(self.tail + position) & Self::MASK])
    }

    /// Mutable block at `position` from the oldest.
    #[inline]
    pub fn get_mut(&mut self, position: usize) -> Option<&mut Block> {
        if position < self.len() {
            Some(&mut self.blocks[(self.tail + position) & Self::MASK])
        } else {
            None
        }
    }

    /// The most recently queued block.
    pub fn newest(&self) -> Option<&Block> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Blocks from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        (0..self.len()).filter_map(move |position| self.get(position))
    }
}

impl<const N: usize> Default for BlockQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn block(steps: i32) -> Block {
        Block::from_delta([steps, 0, 0, 0], 0)
    }

    #[test]
    fn test_push_until_full() {
        let mut queue = BlockQueue::<4>::new();
        assert_eq!(queue.capacity(), 3);

        for i in 1..=3 {
            queue.push(block(i)).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.push(block(4)),
            Err(Error::Planner(PlannerError::QueueFull { capacity: 3 }))
        );
    }

    #[test]
    fn test_fifo_wraparound() {
        let mut queue = BlockQueue::<4>::new();
        for round in 0..5 {
            queue.push(block(round * 2 + 1)).unwrap();
            queue.push(block(round * 2 + 2)).unwrap();

            assert_eq!(queue.peek_head().map(|b| b.step_event_count), Some((round * 2 + 1) as u32));
            queue.discard_head();
            assert_eq!(queue.peek_head().map(|b| b.step_event_count), Some((round * 2 + 2) as u32));
            queue.discard_head();
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_peek_marks_busy() {
        let mut queue = BlockQueue::<8>::new();
        assert!(queue.peek_head().is_none());

        queue.push(block(10)).unwrap();
        assert!(!queue.get(0).unwrap().busy);
        assert!(queue.peek_head().unwrap().busy);
        assert!(queue.get(0).unwrap().busy);
    }

    #[test]
    fn test_discard_empty_is_noop() {
        let mut queue = BlockQueue::<4>::new();
        queue.discard_head();
        assert!(queue.is_empty());
        assert_eq!(queue.tail_index(), 0);
    }

    #[test]
    fn test_flush_keeps_busy() {
        let mut queue = BlockQueue::<8>::new();
        for i in 1..=5 {
            queue.push(block(i)).unwrap();
        }
        queue.flush();
        assert!(queue.is_empty());

        for i in 1..=5 {
            queue.push(block(i)).unwrap();
        }
        queue.peek_head();
        queue.flush();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.newest().unwrap().step_event_count, 1);
    }

    #[test]
    fn test_relative_access() {
        let mut queue = BlockQueue::<4>::new();
        queue.push(block(1)).unwrap();
        queue.push(block(2)).unwrap();
        queue.discard_head();
        queue.push(block(3)).unwrap();
        queue.push(block(4)).unwrap();

        let counts: [u32; 3] = core::array::from_fn(|i| queue.get(i).unwrap().step_event_count);
        assert_eq!(counts, [2, 3, 4]);
        assert_eq!(queue.iter().count(), 3);
        assert!(queue.get(3).is_none());
        assert_eq!(queue.newest().unwrap().step_event_count, 4);
    }
}
