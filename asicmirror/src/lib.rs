#![cfg_attr(not(test), no_std)]

//! Slow-control drivers and per-chip register mirrors for the AFTER and
//! AGET front-end ASICs, plus the DAC/pulser used to stimulate channels
//! under test (§4.2, §3.2).
//!
//! Every driver shares the same [`ShiftBus`] boundary: chip-select,
//! clock and data lines arbitrated by an `SC_REQ`/`SC_GRANT` handshake.
//! [`RegBankShiftBus`] backs it with a real register bank; tests use
//! [`fake::FakeShiftBus`], a loopback double with no hardware
//! underneath.

mod after;
mod aget;
mod dac;
mod error;
#[cfg(test)]
mod fake;
mod mirror;
mod regbus;
mod shiftbus;
mod widths;

pub use after::AfterDriver;
pub use aget::AgetDriver;
pub use dac::DacDriver;
pub use error::ScError;
pub use mirror::{AsicMirror, MAX_CELLS};
pub use regbus::{RegBankShiftBus, SC_CTRL_REG};
pub use shiftbus::{shift_in_msb_first, shift_out_msb_first, ChipSelect, ShiftBus, MAX_SC_REQ_RETRY};
pub use widths::{aget_width_bits, after_width_bits, cells_for_width};
