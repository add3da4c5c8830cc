//! AGET chip driver (§4.2.2): the same shared bus as AFTER, but AGET
//! also exposes a `set_control_mode` line that must be toggled three
//! times before a configuration write takes effect, and its hit
//! register (address 0) is read-only.

use crate::error::ScError;
use crate::mirror::AsicMirror;
use crate::shiftbus::{shift_in_msb_first, shift_out_msb_first, ChipSelect, ShiftBus};
use crate::widths::{aget_width_bits, cells_for_width};

const TRAILING_CLOCKS: usize = 4;
const CONTROL_MODE_TOGGLES: usize = 3;
const HIT_REGISTER: u8 = 0;

pub struct AgetDriver;

impl AgetDriver {
  /// Toggle the control-mode line three times (§4.2.2): AGET requires
  /// this sequence before a configuration register write is latched.
  pub fn set_control_mode<B: ShiftBus>(&self, bus: &mut B, chip: ChipSelect) -> Result<(), ScError> {
    bus.request_bus()?;
    for _ in 0..CONTROL_MODE_TOGGLES {
      bus.begin(chip, 0, false);
      bus.clock_out(true);
      bus.end(chip);
      bus.begin(chip, 0, false);
      bus.clock_out(false);
      bus.end(chip);
    }
    bus.release_bus();
    Ok(())
  }

  pub fn write<B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    reg: u8,
    value: &[u16],
  ) -> Result<(), ScError> {
    if reg == HIT_REGISTER {
      return Err(ScError::UnknownRegister);
    }
    let width_bits = aget_width_bits(reg)?;
    self.set_control_mode(bus, chip)?;
    bus.request_bus()?;
    bus.begin(chip, reg, false);
    shift_out_msb_first(bus, value, width_bits);
    bus.settle(TRAILING_CLOCKS);
    bus.end(chip);
    bus.release_bus();
    mirror.set(chip as usize, reg as usize, value);
    Ok(())
  }

  /// Read any register, including the read-only hit register.
  pub fn read<'a, B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &'a mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    reg: u8,
  ) -> Result<&'a [u16], ScError> {
    let width_bits = aget_width_bits(reg)?;
    let cells = cells_for_width(width_bits);
    let mut value = [0u16; crate::mirror::MAX_CELLS];
    bus.request_bus()?;
    bus.begin(chip, reg, true);
    shift_in_msb_first(bus, width_bits, &mut value[..cells]);
    bus.settle(TRAILING_CLOCKS);
    bus.end(chip);
    bus.release_bus();
    mirror.set(chip as usize, reg as usize, &value[..cells]);
    Ok(mirror.get(chip as usize, reg as usize, cells))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fake::FakeShiftBus;

  #[test]
  fn write_then_read_roundtrips() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AgetDriver;
    driver.write(&mut bus, &mut mirror, 0, 5, &[0x00CD]).unwrap();
    assert_eq!(driver.read(&mut bus, &mut mirror, 0, 5).unwrap(), &[0x00CD]);
  }

  #[test]
  fn hit_register_cannot_be_written() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AgetDriver;
    assert_eq!(
      driver.write(&mut bus, &mut mirror, 0, HIT_REGISTER, &[0]),
      Err(ScError::UnknownRegister)
    );
  }

  #[test]
  fn set_control_mode_requests_the_bus_once_for_the_whole_toggle_sequence() {
    let mut bus = FakeShiftBus::new();
    let driver = AgetDriver;
    driver.set_control_mode(&mut bus, 0).unwrap();
    assert_eq!(bus.request_count, 1);
  }

  #[test]
  fn the_128_bit_register_round_trips_across_eight_cells() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = AgetDriver;
    let value = [0xAAAA, 0xBBBB, 0xCCCC, 0xDDDD, 0x1111, 0x2222, 0x3333, 0x4444];
    driver.write(&mut bus, &mut mirror, 0, 8, &value).unwrap();
    assert_eq!(driver.read(&mut bus, &mut mirror, 0, 8).unwrap(), &value);
  }
}
