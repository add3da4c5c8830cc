//! AFTER chip driver (§4.2.1): shift-register configuration of the
//! analog front-end, addressed by a 6-bit register number plus a
//! read/write bit.

use crate::error::ScError;
use crate::mirror::AsicMirror;
use crate::shiftbus::{shift_in_msb_first, shift_out_msb_first, ChipSelect, ShiftBus};
use crate::widths::{after_width_bits, cells_for_width};

const TRAILING_CLOCKS: usize = 4;

/// Drives the AFTER chips on one card. Holds no state of its own beyond
/// the mirror it is given: every call re-arbitrates the shared bus.
pub struct AfterDriver;

impl AfterDriver {
  /// Write `value` (little-endian cells) to `reg` on `chip`, then read
  /// it back and compare: §4.2.1's verified-write path.
  pub fn write_verified<B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    reg: u8,
    value: &[u16],
  ) -> Result<(), ScError> {
    self.write(bus, mirror, chip, reg, value)?;
    let width_bits = after_width_bits(reg)?;
    let cells = cells_for_width(width_bits);
    let mut readback = [0u16; crate::mirror::MAX_CELLS];
    self.read_into(bus, chip, reg, &mut readback[..cells])?;
    if &readback[..cells] != value {
      return Err(ScError::VerifyMismatch);
    }
    mirror.set(chip as usize, reg as usize, &readback[..cells]);
    Ok(())
  }

  /// Write `value` without a verification read.
  pub fn write<B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    reg: u8,
    value: &[u16],
  ) -> Result<(), ScError> {
    let width_bits = after_width_bits(reg)?;
    bus.request_bus()?;
    bus.begin(chip, reg, false);
    shift_out_msb_first(bus, value, width_bits);
    bus.settle(TRAILING_CLOCKS);
    bus.end(chip);
    bus.release_bus();
    mirror.set(chip as usize, reg as usize, value);
    Ok(())
  }

  /// Read `reg` on `chip` into the mirror and return its current value.
  pub fn read<'a, B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &'a mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    reg: u8,
  ) -> Result<&'a [u16], ScError> {
    let width_bits = after_width_bits(reg)?;
    let cells = cells_for_width(width_bits);
    let mut value = [0u16; crate::mirror::MAX_CELLS];
    self.read_into(bus, chip, reg, &mut value[..cells])?;
    mirror.set(chip as usize, reg as usize, &value[..cells]);
    Ok(mirror.get(chip as usize, reg as usize, cells))
  }

  fn read_into<B: ShiftBus>(
    &self,
    bus: &mut B,
    chip: ChipSelect,
    reg: u8,
    out: &mut [u16],
  ) -> Result<(), ScError> {
    let width_bits = after_width_bits(reg)?;
    bus.request_bus()?;
    bus.begin(chip, reg, true);
    shift_in_msb_first(bus, width_bits, out);
    bus.settle(TRAILING_CLOCKS);
    bus.end(chip);
    bus.release_bus();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fake::FakeShiftBus;

  #[test]
  fn write_then_read_roundtrips_through_a_loopback_bus() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AfterDriver;
    driver.write(&mut bus, &mut mirror, 0, 5, &[0x00AB]).unwrap();
    let value = driver.read(&mut bus, &mut mirror, 0, 5).unwrap();
    assert_eq!(value, &[0x00AB]);
  }

  #[test]
  fn verified_write_matches_when_the_bus_loops_back_correctly() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AfterDriver;
    driver
      .write_verified(&mut bus, &mut mirror, 0, 5, &[0x1234])
      .unwrap();
    assert_eq!(mirror.get(0, 5, 1), &[0x1234]);
  }

  #[test]
  fn unknown_register_is_rejected_before_touching_the_bus() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AfterDriver;
    assert_eq!(
      driver.write(&mut bus, &mut mirror, 0, 200, &[0]),
      Err(ScError::UnknownRegister)
    );
  }

  #[test]
  fn write_of_the_wide_38_bit_register_spans_three_cells() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AfterDriver;
    driver
      .write(&mut bus, &mut mirror, 0, 12, &[0xFFFF, 0xFFFF, 0b11])
      .unwrap();
    let value = driver.read(&mut bus, &mut mirror, 0, 12).unwrap();
    assert_eq!(value, &[0xFFFF, 0xFFFF, 0b11]);
  }
}
