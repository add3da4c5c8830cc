//! A loopback [`ShiftBus`] test double: whatever is shifted out for a
//! given `(chip, addr)` is played back on the next read of the same
//! `(chip, addr)`. Used only by this crate's own unit tests: there is
//! no real bus to exercise without hardware.

use crate::error::ScError;
use crate::mirror::MAX_CELLS;
use crate::shiftbus::{ChipSelect, ShiftBus};

const MAX_CHIPS: usize = 4;
const MAX_ADDR: usize = 256;

#[derive(Clone, Copy)]
struct StoredReg {
  cells: [u16; MAX_CELLS],
  width_bits: usize,
}

impl StoredReg {
  const fn empty() -> Self {
    StoredReg {
      cells: [0; MAX_CELLS],
      width_bits: 0,
    }
  }
}

pub struct FakeShiftBus {
  store: [[StoredReg; MAX_ADDR]; MAX_CHIPS],
  current: Option<(ChipSelect, u8, bool)>,
  write_bits: heapless::Vec<bool, 256>,
  read_cursor: usize,
  /// How many times `request_bus` was called, for tests that care about
  /// arbitration behavior.
  pub request_count: u32,
}

impl FakeShiftBus {
  pub fn new() -> Self {
    FakeShiftBus {
      store: [[StoredReg::empty(); MAX_ADDR]; MAX_CHIPS],
      current: None,
      write_bits: heapless::Vec::new(),
      read_cursor: 0,
      request_count: 0,
    }
  }
}

impl Default for FakeShiftBus {
  fn default() -> Self {
    Self::new()
  }
}

impl ShiftBus for FakeShiftBus {
  fn request_bus(&mut self) -> Result<(), ScError> {
    self.request_count += 1;
    Ok(())
  }

  fn release_bus(&mut self) {}

  fn begin(&mut self, chip: ChipSelect, addr: u8, read: bool) {
    self.current = Some((chip, addr, read));
    if read {
      let reg = &self.store[chip as usize][addr as usize];
      self.read_cursor = reg.width_bits;
    } else {
      self.write_bits.clear();
    }
  }

  fn end(&mut self, chip: ChipSelect) {
    if let Some((_, addr, read)) = self.current.take() {
      if !read {
        let width_bits = self.write_bits.len();
        let mut cells = [0u16; MAX_CELLS];
        for (j, bit) in self.write_bits.iter().enumerate() {
          let i = width_bits - 1 - j;
          if *bit {
            cells[i / 16] |= 1 << (i % 16);
          }
        }
        self.store[chip as usize][addr as usize] = StoredReg { cells, width_bits };
      }
    }
  }

  fn clock_out(&mut self, bit: bool) {
    let _ = self.write_bits.push(bit);
  }

  fn settle(&mut self, _count: usize) {
    // Dummy clocks carry no data; unlike `clock_out`, the loopback store
    // does not record them.
  }

  fn clock_in(&mut self) -> bool {
    let Some((chip, addr, true)) = self.current else {
      return false;
    };
    if self.read_cursor == 0 {
      return false;
    }
    self.read_cursor -= 1;
    let i = self.read_cursor;
    let reg = &self.store[chip as usize][addr as usize];
    (reg.cells[i / 16] >> (i % 16)) & 1 != 0
  }
}
