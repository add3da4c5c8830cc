//! DAC / pulser driver (§4.2.3): a single 12-bit code per channel,
//! shifted through the same bus as AFTER and AGET but with no readback
//! path: the DAC is write-only hardware.

use crate::error::ScError;
use crate::mirror::AsicMirror;
use crate::shiftbus::{shift_out_msb_first, ChipSelect, ShiftBus};

const DAC_WIDTH_BITS: usize = 12;
const TRAILING_CLOCKS: usize = 2;

/// DAC/pulser register address space is flat: one "register" per
/// channel, holding that channel's current code.
pub struct DacDriver;

impl DacDriver {
  /// Set `chan`'s DAC code. `code` is masked to 12 bits before shifting.
  pub fn set_code<B: ShiftBus, const CHIPS: usize, const REGS: usize>(
    &self,
    bus: &mut B,
    mirror: &mut AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    chan: u8,
    code: u16,
  ) -> Result<(), ScError> {
    let masked = code & ((1 << DAC_WIDTH_BITS) - 1);
    bus.request_bus()?;
    bus.begin(chip, chan, false);
    shift_out_msb_first(bus, &[masked], DAC_WIDTH_BITS);
    bus.settle(TRAILING_CLOCKS);
    bus.end(chip);
    bus.release_bus();
    mirror.set(chip as usize, chan as usize, &[masked]);
    Ok(())
  }

  /// Last code written to `chan`, from the mirror (there is no hardware
  /// readback).
  pub fn last_code<const CHIPS: usize, const REGS: usize>(
    mirror: &AsicMirror<CHIPS, REGS>,
    chip: ChipSelect,
    chan: u8,
  ) -> u16 {
    mirror.get(chip as usize, chan as usize, 1)[0]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fake::FakeShiftBus;

  #[test]
  fn set_code_masks_to_twelve_bits_and_mirrors() {
    let mut bus = FakeShiftBus::new();
    let mut mirror = AsicMirror::<1, 16>::new();
    let driver = DacDriver;
    driver.set_code(&mut bus, &mut mirror, 0, 3, 0xFFFF).unwrap();
    assert_eq!(DacDriver::last_code(&mirror, 0, 3), 0x0FFF);
  }
}
