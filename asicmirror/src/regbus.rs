//! [`ShiftBus`] backed by a single control register on the card's
//! [`RegisterBank`] (§4.2): `SC_REQ`/`SC_GRANT` arbitrate the bus,
//! `CS`/`ADDR`/`RW` frame a transaction, `CLK`/`DATA_OUT`/`DATA_IN`
//! bit-bang the payload. Every field lives in one 32-bit word, written
//! through `rmw` so unrelated bits never move (§8 property 15).

use regbank::{Field, RegAddr, RegisterBank};

use crate::error::ScError;
use crate::shiftbus::{ChipSelect, ShiftBus, MAX_SC_REQ_RETRY};

/// Default offset of the slow-control control register within the
/// card's register bank. Callers with a different layout pass their
/// own address to [`RegBankShiftBus::new`].
pub const SC_CTRL_REG: RegAddr = 0x00;

const SC_REQ: Field = Field::new(0x0000_0001, 0);
const SC_GRANT: Field = Field::new(0x0000_0002, 1);
const CS_ENABLE: Field = Field::new(0x0000_0004, 2);
const CS: Field = Field::new(0x0000_0078, 3);
const RW: Field = Field::new(0x0000_0080, 7);
const ADDR: Field = Field::new(0x0000_7F00, 8);
const CLK: Field = Field::new(0x0000_8000, 15);
const DATA_OUT: Field = Field::new(0x0001_0000, 16);
const DATA_IN: Field = Field::new(0x0002_0000, 17);

/// A [`ShiftBus`] whose clock/data/chip-select/address lines are each one
/// field of a single register, read back and rewritten through `rmw` on
/// every bit. `B` is typically `dyn RegisterBank` so the same bank
/// instance can back `reg`'s direct register access and the slow-control
/// bus at once, one borrow at a time.
pub struct RegBankShiftBus<'a, B: RegisterBank + ?Sized> {
  bank: &'a mut B,
  addr: RegAddr,
}

impl<'a, B: RegisterBank + ?Sized> RegBankShiftBus<'a, B> {
  pub fn new(bank: &'a mut B, addr: RegAddr) -> Self {
    RegBankShiftBus { bank, addr }
  }
}

impl<'a, B: RegisterBank + ?Sized> ShiftBus for RegBankShiftBus<'a, B> {
  fn request_bus(&mut self) -> Result<(), ScError> {
    self.bank.rmw(self.addr, SC_REQ, 1);
    for _ in 0..MAX_SC_REQ_RETRY {
      if self.bank.read_field(self.addr, SC_GRANT) != 0 {
        return Ok(());
      }
    }
    self.bank.rmw(self.addr, SC_REQ, 0);
    Err(ScError::NotGranted)
  }

  fn release_bus(&mut self) {
    self.bank.rmw(self.addr, SC_REQ, 0);
  }

  fn begin(&mut self, chip: ChipSelect, addr: u8, read: bool) {
    self.bank.rmw(self.addr, CS, chip as u32);
    self.bank.rmw(self.addr, ADDR, addr as u32);
    self.bank.rmw(self.addr, RW, read as u32);
    self.bank.rmw(self.addr, CS_ENABLE, 1);
  }

  fn end(&mut self, _chip: ChipSelect) {
    self.bank.rmw(self.addr, CS_ENABLE, 0);
  }

  fn clock_out(&mut self, bit: bool) {
    self.bank.rmw(self.addr, DATA_OUT, bit as u32);
    self.bank.rmw(self.addr, CLK, 1);
    self.bank.rmw(self.addr, CLK, 0);
  }

  fn clock_in(&mut self) -> bool {
    self.bank.rmw(self.addr, CLK, 1);
    let bit = self.bank.read_field(self.addr, DATA_IN) != 0;
    self.bank.rmw(self.addr, CLK, 0);
    bit
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use regbank::SimRegisterBank;

  #[test]
  fn request_bus_succeeds_once_grant_is_asserted() {
    let mut bank = SimRegisterBank::<2>::new();
    bank.write(0, SC_GRANT.mask());
    let mut bus = RegBankShiftBus::new(&mut bank, SC_CTRL_REG);
    assert!(bus.request_bus().is_ok());
  }

  #[test]
  fn request_bus_fails_without_a_grant_and_deasserts_req() {
    let mut bank = SimRegisterBank::<2>::new();
    let mut bus = RegBankShiftBus::new(&mut bank, SC_CTRL_REG);
    assert_eq!(bus.request_bus(), Err(ScError::NotGranted));
    assert_eq!(SC_REQ.get(bank.read(0)), 0);
  }

  #[test]
  fn begin_sets_chip_select_address_and_rw_without_disturbing_req() {
    let mut bank = SimRegisterBank::<2>::new();
    bank.write(0, SC_GRANT.mask());
    let mut bus = RegBankShiftBus::new(&mut bank, SC_CTRL_REG);
    bus.request_bus().unwrap();
    bus.begin(3, 42, true);
    assert_eq!(CS.get(bank.read(0)), 3);
    assert_eq!(ADDR.get(bank.read(0)), 42);
    assert_eq!(RW.get(bank.read(0)), 1);
    assert_eq!(SC_REQ.get(bank.read(0)), 1);
  }

  #[test]
  fn clock_out_drives_data_out_and_leaves_the_clock_low() {
    let mut bank = SimRegisterBank::<2>::new();
    let mut bus = RegBankShiftBus::new(&mut bank, SC_CTRL_REG);
    bus.clock_out(true);
    assert_eq!(DATA_OUT.get(bank.read(0)), 1);
    assert_eq!(CLK.get(bank.read(0)), 0);
  }
}
