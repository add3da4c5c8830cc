#![cfg_attr(not(test), no_std)]

//! Wire format shared by the Feminos/TCM firmware and the host-side tooling.
//!
//! Everything here is a pure, hardware-independent codec: short-word
//! (`u16`) prefix taxonomy (§4.3.1), whole-frame framing (§3.5, §6.1),
//! configuration-reply and multi-purpose frame builders (§4.3.3, §4.3.4),
//! and the built-event container used by the TCM to concatenate one frame
//! per participating Feminos (§4.3.2). None of it touches a register, a
//! socket, or a ring buffer: callers wire it to hardware.

pub mod codes;
pub mod error;
pub mod event;
pub mod frame;
pub mod item;
pub mod prefix;

pub use codes::ErrorCode;
pub use error::FrameError;
pub use event::{decode_built_event, encode_built_event, BuiltEvent};
pub use frame::{CFrame, DFrameHeader, FrameHeader, FrameKind, MFrame};
pub use item::{CardChipChan, FrameItem};

/// Framing-protocol version carried in the top bits of every start prefix.
///
/// The original firmware bumped this whenever the frame layout changed in a
/// way that was not backwards compatible; we start a fresh reimplementation
/// at version 1.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum number of ASICs a single Feminos card multiplexes.
pub const MAX_ASIC: usize = 4;

/// Maximum channel count across the AFTER (78 used of 72 analog + control)
/// and AGET (64 real + FPN/reset) families.
pub const MAX_CHANNEL: usize = 80;
