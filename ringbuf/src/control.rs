//! The ring pump's control register bit layout (§4.1 `io_control`).

use regbank::Field;

/// Start/stop the hardware fill engine.
pub const RUN: Field = Field::new(0x0000_0001, 0);
/// Software-requested reset of the FIFOs.
pub const RESET: Field = Field::new(0x0000_0002, 1);
/// Retrieve-pending: force hardware to flush a partially filled buffer.
pub const RETPND: Field = Field::new(0x0000_0004, 2);
/// Enable the partial-buffer timeout.
pub const TIMED: Field = Field::new(0x0000_0008, 3);
/// Partial-buffer timeout duration.
pub const TIMEVAL: Field = Field::new(0x0000_0030, 4);

/// `TIMEVAL` encodings (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutValue {
  Ms1 = 0,
  Ms10 = 1,
  Ms100 = 2,
  S1 = 3,
}

impl TimeoutValue {
  pub const fn field_value(self) -> u32 {
    self as u32
  }
}
