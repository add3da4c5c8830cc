//! Short-word prefix constants and the masks used to classify them (§4.3.1,
//! §6.1). Precedence when scanning a body for the next item is the order
//! the masks are listed in the spec table: 14-bit class, 12-bit classes,
//! 9-bit class, 8-bit class, 4-bit class, then the literal (exact-match)
//! sentinels.
//!
//! Frame-start markers (`START_OF_{DFRAME,MFRAME,CFRAME}`) share the 9-bit
//! class's mask with `TIME_BIN_IX`/`HISTO_BIN_IX`, and the 14-bit class's
//! `HIT_IX` tag happens to collide bit-for-bit with `START_OF_DFRAME`
//! (`0x8000` under both `0xC000` and `0xFE00`). The original firmware never
//! actually disambiguates these through the generic dispatcher: a frame's
//! start word is always read by a dedicated "read the header" step before
//! the body-item loop begins, and the body loop never re-enters that step.
//! We keep the same split here: [`crate::frame`] peels the start prefix
//! first; [`crate::item::FrameItem::decode`] only ever sees body words.

/// Mask isolating the 9-bit start-frame / time-histo class.
pub const START_FRAME_MASK: u16 = 0xFE00;

pub const PFX_START_OF_DFRAME: u16 = 0x8000;
pub const PFX_START_OF_MFRAME: u16 = 0x8200;
pub const PFX_START_OF_CFRAME: u16 = 0x8400;
pub const PFX_TIME_BIN_IX: u16 = 0x8600;
pub const PFX_HISTO_BIN_IX: u16 = 0x8800;

/// Mask isolating the 14-bit (card, chip, chan) class.
pub const CARD_CHIP_CHAN_MASK: u16 = 0xC000;
pub const PFX_CARD_CHIP_CHAN_HIT_IX: u16 = 0x8000;
pub const PFX_CARD_CHIP_CHAN_HIT_CNT: u16 = 0x4000;
pub const PFX_CARD_CHIP_CHAN_HISTO: u16 = 0xC000;

/// Mask isolating the two 12-bit classes (ADC sample, latency-histo bin).
pub const TWELVE_BIT_MASK: u16 = 0xF000;
pub const PFX_ADC_SAMPLE: u16 = 0xF000;
pub const PFX_LAT_HISTO_BIN: u16 = 0xE000;

/// Mask isolating the 8-bit ASCII-length class; low byte is the length.
pub const ASCII_MSG_LEN_MASK: u16 = 0xFF00;
pub const PFX_ASCII_MSG_LEN: u16 = 0xFF00;

/// Mask isolating the 4-bit event-boundary class.
pub const EVENT_MASK: u16 = 0xFFF0;
pub const PFX_START_OF_EVENT: u16 = 0xFFA0;
pub const PFX_END_OF_EVENT: u16 = 0xFFB0;

/// Literal (exact-match) sentinels. Values are this reimplementation's own
/// assignment: the spec only pins down the bit-exact constants listed
/// above, leaving these "various" (§4.3.1 table, 0-bit row).
pub const PFX_NULL_CONTENT: u16 = 0x0000;
pub const PFX_END_OF_FRAME: u16 = 0x0001;
pub const PFX_START_OF_BUILT_EVENT: u16 = 0x0002;
pub const PFX_SOBE_SIZE: u16 = 0x0003;
pub const PFX_END_OF_BUILT_EVENT: u16 = 0x0004;
pub const PFX_CMD_STATISTICS: u16 = 0x0005;
pub const PFX_PEDESTAL_H_MD: u16 = 0x0006;
pub const PFX_PEDESTAL_HSTAT: u16 = 0x0007;
pub const PFX_DEADTIME_HSTAT_BINS: u16 = 0x0008;
pub const PFX_SHISTO_BINS: u16 = 0x0009;
pub const PFX_PEDTHR_LIST: u16 = 0x000A;

/// Base tag for the per-chip `CH_HIT_CNT_HISTO_CHIP_IX(n)` family; the chip
/// index is folded into the low bits, `n` in `0..MAX_ASIC`.
pub const PFX_CH_HIT_CNT_HISTO_CHIP_IX_BASE: u16 = 0x0010;

/// Number of trailing summary shorts per `DEADTIME_HSTAT_BINS` field
/// (4 bytes each, §4.3.1: "2 header shorts + 9 × (4-byte ... fields)").
pub const DEADTIME_HSTAT_FIELD_COUNT: usize = 9;
