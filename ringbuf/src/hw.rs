//! Hardware boundary for the ring pump (§4.1): two lock-free FIFOs (one
//! hardware fills, one software drains), a handful of configuration
//! registers, and byte-addressable access to the buffer region itself
//! so the pump can stamp the software frame header in place.

/// Everything the ring pump needs from the FPGA fabric.
///
/// A real implementation backs every method with a volatile MMIO
/// access; [`crate::sim::SimRingHw`] backs it with plain arrays for
/// host-side tests.
pub trait RingHw {
  /// Push a descriptor onto the hardware's free-buffer input FIFO.
  fn push_free(&mut self, descriptor: u32);

  /// Pop one descriptor off the hardware's filled-buffer output FIFO.
  /// `None` on the underflow sentinel (queue empty).
  fn pop_filled(&mut self) -> Option<u32>;

  /// Program the base address of the 128-buffer region.
  fn write_base(&mut self, base: u32);

  /// Program the per-buffer capacity in bytes.
  fn write_capacity(&mut self, capacity: u16);

  /// Read the control register (RUN/RESET/RETPND/TIMED/TIMEVAL).
  fn read_control(&mut self) -> u32;

  /// Write the control register.
  fn write_control(&mut self, value: u32);

  /// Write one 16-bit word at a byte address inside the buffer region,
  /// used to stamp the software frame header and end-of-frame sentinel.
  fn write_u16(&mut self, addr: u32, value: u16);

  /// Read one 16-bit word back, used by the `PED_HISTO`/`HIT_HISTO`
  /// sinks (§4.7 step 3) to decode a buffer's frame body in place
  /// instead of copying it out first.
  fn read_u16(&mut self, addr: u32) -> u16;
}
