//! An in-memory [`RingHw`], used by this crate's own tests and by the
//! host-side tooling's simulated card.

use crate::hw::RingHw;
use heapless::Deque;

const FIFO_CAPACITY: usize = 256;
/// Covers the full 128 buffers * 8192-byte stride address span used by
/// [`crate::descriptor::BufferId`] addressing.
const MEMORY_WORDS: usize = 1 << 19;

pub struct SimRingHw {
  free_fifo: Deque<u32, FIFO_CAPACITY>,
  filled_fifo: Deque<u32, FIFO_CAPACITY>,
  control: u32,
  base: u32,
  capacity: u16,
  memory: [u16; MEMORY_WORDS],
}

impl SimRingHw {
  pub fn new() -> Self {
    SimRingHw {
      free_fifo: Deque::new(),
      filled_fifo: Deque::new(),
      control: 0,
      base: 0,
      capacity: 0,
      memory: [0; MEMORY_WORDS],
    }
  }

  pub fn free_fifo_len(&self) -> usize {
    self.free_fifo.len()
  }

  /// Move the next descriptor from the free FIFO to the filled FIFO,
  /// as hardware would after digitizing a buffer, stamping `size` into
  /// its descriptor.
  pub fn simulate_fill(&mut self, size: u16) -> Option<u32> {
    let raw = self.free_fifo.pop_front()?;
    let id = crate::descriptor::BufferId::from_raw(raw).with_size(size);
    self.filled_fifo.push_back(id.raw()).ok()?;
    Some(id.raw())
  }

}

impl Default for SimRingHw {
  fn default() -> Self {
    Self::new()
  }
}

impl RingHw for SimRingHw {
  fn push_free(&mut self, descriptor: u32) {
    let _ = self.free_fifo.push_back(descriptor);
  }

  fn pop_filled(&mut self) -> Option<u32> {
    self.filled_fifo.pop_front()
  }

  fn write_base(&mut self, base: u32) {
    self.base = base;
  }

  fn write_capacity(&mut self, capacity: u16) {
    self.capacity = capacity;
  }

  fn read_control(&mut self) -> u32 {
    self.control
  }

  fn write_control(&mut self, value: u32) {
    self.control = value;
  }

  fn write_u16(&mut self, addr: u32, value: u16) {
    let offset = (addr - self.base) as usize / 2;
    if let Some(slot) = self.memory.get_mut(offset) {
      *slot = value;
    }
  }

  fn read_u16(&mut self, addr: u32) -> u16 {
    let offset = (addr - self.base) as usize / 2;
    self.memory.get(offset).copied().unwrap_or(0)
  }
}
