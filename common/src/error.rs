//! Frame codec errors.
//!
//! A plain enum with a manual [`defmt::Format`] impl rather than a
//! derive-macro error crate, so it stays usable from `#![no_std]` callers
//! with no allocator.

/// Errors raised while decoding or encoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
  /// The decoder read more bytes than the frame's declared size allowed
  /// (§4.3.1: "Bytes-read > declared-size is `FormatError`").
  Overrun,
  /// The frame ended without an `END_OF_FRAME` / `END_OF_BUILT_EVENT`
  /// sentinel and without reaching its declared size.
  Truncated,
  /// The first short of a frame did not match any `START_OF_*` prefix.
  UnknownStart,
  /// A declared size was odd; every frame on the wire is an even number of
  /// bytes (§3.5 invariant 1).
  OddSize,
  /// An ASCII payload was not valid UTF-8 / printable, or its declared
  /// length overflowed the buffer it was decoded into.
  BadAscii,
  /// A fixed-capacity buffer (heapless `Vec`/`String`) would have
  /// overflowed while encoding or decoding.
  Capacity,
  /// A body item tag did not match any known prefix class.
  UnknownItem(u16),
}

#[cfg(feature = "defmt")]
impl defmt::Format for FrameError {
  fn format(&self, f: defmt::Formatter) {
    match self {
      FrameError::Overrun => defmt::write!(f, "frame overrun"),
      FrameError::Truncated => defmt::write!(f, "frame truncated"),
      FrameError::UnknownStart => defmt::write!(f, "unknown frame start prefix"),
      FrameError::OddSize => defmt::write!(f, "odd frame size"),
      FrameError::BadAscii => defmt::write!(f, "malformed ASCII payload"),
      FrameError::Capacity => defmt::write!(f, "fixed buffer capacity exceeded"),
      FrameError::UnknownItem(tag) => defmt::write!(f, "unknown item tag {:#06x}", tag),
    }
  }
}

impl core::fmt::Display for FrameError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      FrameError::Overrun => write!(f, "frame overrun"),
      FrameError::Truncated => write!(f, "frame truncated"),
      FrameError::UnknownStart => write!(f, "unknown frame start prefix"),
      FrameError::OddSize => write!(f, "odd frame size"),
      FrameError::BadAscii => write!(f, "malformed ASCII payload"),
      FrameError::Capacity => write!(f, "fixed buffer capacity exceeded"),
      FrameError::UnknownItem(tag) => write!(f, "unknown item tag {:#06x}", tag),
    }
  }
}
