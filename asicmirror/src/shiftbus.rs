//! Hardware boundary for the bit-banged slow-control bus shared by every
//! chip on a card (§4.2): one clock/data/chip-select trio, arbitrated by
//! an `SC_REQ`/`SC_GRANT` handshake before any chip may be addressed.
//!
//! Real hardware backs this with GPIO-style register writes; tests back
//! it with [`crate::fake::FakeShiftBus`], a loopback shift register that
//! records what was clocked out and replays it on read.

use crate::error::ScError;

/// How many times to re-assert `SC_REQ` before giving up (§4.2).
pub const MAX_SC_REQ_RETRY: u8 = 8;

/// Chip-select line selector: each chip on the card gets its own CS.
pub type ChipSelect = u8;

/// Bit-level access to the shared slow-control bus.
///
/// Implementations drive three lines (chip-select, clock, data-out) and
/// sample one (data-in). `request_bus`/`release_bus` arbitrate ownership
/// of the shared bus among the card's chips; every other method assumes
/// the caller already holds it.
///
/// Addressing is framed explicitly through `begin`/`end` rather than by
/// bit-banging the register number through `clock_out` like the payload:
/// every chip family in §4.2 starts a transaction by asserting
/// chip-select and clocking out an address plus a read/write bit before
/// the payload, so that framing step is common HAL surface, while the
/// payload width and bit order stay in the per-chip driver.
pub trait ShiftBus {
  /// Assert `SC_REQ` and poll `SC_GRANT`, retrying up to
  /// [`MAX_SC_REQ_RETRY`] times. Returns [`ScError::NotGranted`] on
  /// exhaustion.
  fn request_bus(&mut self) -> Result<(), ScError>;

  /// Release `SC_REQ`, letting another requester win arbitration.
  fn release_bus(&mut self);

  /// Assert chip-select for `chip` and clock out `addr` with the
  /// trailing read/write bit, leaving the bus ready to shift a payload.
  fn begin(&mut self, chip: ChipSelect, addr: u8, read: bool);

  /// Deassert chip-select, ending the transaction.
  fn end(&mut self, chip: ChipSelect);

  /// Drive the data-out line, then toggle the clock line high then low
  /// (one full clock pulse per call, data held stable across it).
  fn clock_out(&mut self, bit: bool);

  /// Toggle the clock line and sample data-in on its rising edge.
  fn clock_in(&mut self) -> bool;

  /// Pulse the clock `count` times with data-out held low and without
  /// sampling data-in: the trailing "settle" clocks several chips in
  /// §4.2 require after the payload.
  fn settle(&mut self, count: usize) {
    for _ in 0..count {
      self.clock_out(false);
    }
  }
}

/// Shift `width_bits` of `cells` (little-endian array of 16-bit words,
/// bit 0 of `cells[0]` is the least-significant bit of the register) out
/// MSB-first, which is how every driver in §4.2 addresses and writes a
/// chip.
pub fn shift_out_msb_first<B: ShiftBus>(bus: &mut B, cells: &[u16], width_bits: usize) {
  for i in (0..width_bits).rev() {
    let cell = cells[i / 16];
    let bit = (cell >> (i % 16)) & 1 != 0;
    bus.clock_out(bit);
  }
}

/// Shift `width_bits` in MSB-first, filling `out` the same way
/// `shift_out_msb_first` reads it.
pub fn shift_in_msb_first<B: ShiftBus>(bus: &mut B, width_bits: usize, out: &mut [u16]) {
  for cell in out.iter_mut() {
    *cell = 0;
  }
  for i in (0..width_bits).rev() {
    if bus.clock_in() {
      out[i / 16] |= 1 << (i % 16);
    }
  }
}
