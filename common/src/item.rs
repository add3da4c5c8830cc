//! The tagged `FrameItem` enum and its single-item encode/decode, per the
//! design notes in spec §9: "the natural representation is a tagged enum
//! `FrameItem { AdcSample(u12), HitChan{card, chip, chan}, ... }` with a
//! decoder that returns an iterator of `FrameItem`."

use crate::error::FrameError;
use crate::prefix::*;

/// Maximum capacity for the "tag + count + raw words" family of items
/// (register dumps, histograms, pedestal/threshold lists). Large enough
/// to carry one channel's full pedestal histogram in one item (§4.3.4).
pub const MAX_TAGGED_WORDS: usize = 256;

pub type WordVec = heapless::Vec<u16, MAX_TAGGED_WORDS>;

/// (card, chip, channel) coordinate packed into the low 14 bits of a short
/// (§4.3.1, 14-bit class): 5-bit card, 2-bit chip, 7-bit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardChipChan {
  pub card: u8,
  pub chip: u8,
  pub chan: u8,
}

impl CardChipChan {
  const CARD_SHIFT: u16 = 9;
  const CARD_MASK: u16 = 0x1F;
  const CHIP_SHIFT: u16 = 7;
  const CHIP_MASK: u16 = 0x3;
  const CHAN_MASK: u16 = 0x7F;

  fn pack(self) -> u16 {
    ((self.card as u16 & Self::CARD_MASK) << Self::CARD_SHIFT)
      | ((self.chip as u16 & Self::CHIP_MASK) << Self::CHIP_SHIFT)
      | (self.chan as u16 & Self::CHAN_MASK)
  }

  fn unpack(payload: u16) -> Self {
    CardChipChan {
      card: ((payload >> Self::CARD_SHIFT) & Self::CARD_MASK) as u8,
      chip: ((payload >> Self::CHIP_SHIFT) & Self::CHIP_MASK) as u8,
      chan: (payload & Self::CHAN_MASK) as u8,
    }
  }
}

/// Header fields shared by `DEADTIME_HSTAT_BINS` (§4.3.1): two leading
/// shorts followed by nine 4-byte summary fields, skipped wholesale by the
/// sink-independent decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadtimeHstat {
  pub header: [u16; 2],
  pub fields: [u32; DEADTIME_HSTAT_FIELD_COUNT],
}

/// One decoded body item. `EndOfFrame`/`NullContent` carry no payload;
/// compound items bundle their trailing shorts so a single `FrameItem`
/// always corresponds to a whole, self-contained wire record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameItem {
  HitIndex(CardChipChan),
  HitCount(CardChipChan),
  HitHisto(CardChipChan),
  AdcSample(u16),
  LatHistoBin { bin: u16, content: u32 },
  TimeBinIx(u16),
  HistoBinIx(u16),
  AsciiMsg(heapless::String<240>),
  StartOfEvent { timestamp: u64, event_count: u32 },
  EndOfEvent { timestamp: u64, event_count: u32 },
  EndOfFrame,
  NullContent,
  DeadtimeHstatBins(DeadtimeHstat),
  PedestalHMd(WordVec),
  PedestalHstat(WordVec),
  ShistoBins(WordVec),
  CmdStatistics(WordVec),
  PedthrList(WordVec),
  ChHitCntHistoChipIx { chip: u8, words: WordVec },
}

/// Result of decoding one item: the item and the number of *bytes*
/// consumed from the body (always even, §3.5 invariant 1).
pub struct Decoded {
  pub item: FrameItem,
  pub bytes: usize,
}

fn pack_timestamp(ts: u64) -> [u16; 3] {
  [(ts & 0xFFFF) as u16, ((ts >> 16) & 0xFFFF) as u16, ((ts >> 32) & 0xFFFF) as u16]
}

fn unpack_timestamp(lo: u16, mid: u16, hi: u16) -> u64 {
  (lo as u64) | ((mid as u64) << 16) | ((hi as u64) << 32)
}

fn pack_u32(v: u32) -> [u16; 2] {
  [(v & 0xFFFF) as u16, (v >> 16) as u16]
}

fn unpack_u32(lo: u16, hi: u16) -> u32 {
  (lo as u32) | ((hi as u32) << 16)
}

impl FrameItem {
  /// Encode this item into `out`, returning the number of shorts written.
  pub fn encode(&self, out: &mut heapless::Vec<u16, 512>) -> Result<usize, FrameError> {
    let start = out.len();
    let mut push = |v: u16| out.push(v).map_err(|_| FrameError::Capacity);
    match self {
      FrameItem::HitIndex(c) => push(PFX_CARD_CHIP_CHAN_HIT_IX | c.pack())?,
      FrameItem::HitCount(c) => push(PFX_CARD_CHIP_CHAN_HIT_CNT | c.pack())?,
      FrameItem::HitHisto(c) => push(PFX_CARD_CHIP_CHAN_HISTO | c.pack())?,
      FrameItem::AdcSample(s) => push(PFX_ADC_SAMPLE | (s & 0x0FFF))?,
      FrameItem::LatHistoBin { bin, content } => {
        push(PFX_LAT_HISTO_BIN | (bin & 0x0FFF))?;
        let [lo, hi] = pack_u32(*content);
        push(lo)?;
        push(hi)?;
      }
      FrameItem::TimeBinIx(ix) => push(PFX_TIME_BIN_IX | (ix & 0x01FF))?,
      FrameItem::HistoBinIx(ix) => push(PFX_HISTO_BIN_IX | (ix & 0x01FF))?,
      FrameItem::AsciiMsg(s) => {
        let len = s.len();
        if len > 0xFF {
          return Err(FrameError::Capacity);
        }
        push(PFX_ASCII_MSG_LEN | (len as u16))?;
        encode_ascii_body(s.as_bytes(), out)?;
      }
      FrameItem::StartOfEvent { timestamp, event_count } => {
        push(PFX_START_OF_EVENT)?;
        let [tl, tm, th] = pack_timestamp(*timestamp);
        let [cl, ch] = pack_u32(*event_count);
        push(tl)?;
        push(tm)?;
        push(th)?;
        push(cl)?;
        push(ch)?;
      }
      FrameItem::EndOfEvent { timestamp, event_count } => {
        push(PFX_END_OF_EVENT)?;
        let [tl, tm, th] = pack_timestamp(*timestamp);
        let [cl, ch] = pack_u32(*event_count);
        push(tl)?;
        push(tm)?;
        push(th)?;
        push(cl)?;
        push(ch)?;
      }
      FrameItem::EndOfFrame => push(PFX_END_OF_FRAME)?,
      FrameItem::NullContent => push(PFX_NULL_CONTENT)?,
      FrameItem::DeadtimeHstatBins(d) => {
        push(PFX_DEADTIME_HSTAT_BINS)?;
        push(d.header[0])?;
        push(d.header[1])?;
        for field in d.fields {
          let [lo, hi] = pack_u32(field);
          push(lo)?;
          push(hi)?;
        }
      }
      FrameItem::PedestalHMd(words) => encode_tagged_words(PFX_PEDESTAL_H_MD, words, out)?,
      FrameItem::PedestalHstat(words) => encode_tagged_words(PFX_PEDESTAL_HSTAT, words, out)?,
      FrameItem::ShistoBins(words) => encode_tagged_words(PFX_SHISTO_BINS, words, out)?,
      FrameItem::CmdStatistics(words) => encode_tagged_words(PFX_CMD_STATISTICS, words, out)?,
      FrameItem::PedthrList(words) => encode_tagged_words(PFX_PEDTHR_LIST, words, out)?,
      FrameItem::ChHitCntHistoChipIx { chip, words } => {
        let tag = PFX_CH_HIT_CNT_HISTO_CHIP_IX_BASE + (*chip as u16);
        encode_tagged_words(tag, words, out)?
      }
    }
    Ok(out.len() - start)
  }

  /// Decode one item from the front of `body`. `body` must contain only
  /// whole shorts of the frame's remaining bytes (an odd trailing byte is
  /// a caller bug, not a wire condition: every frame is even-sized).
  pub fn decode(body: &[u16]) -> Result<Decoded, FrameError> {
    let Some(&tag) = body.first() else {
      return Err(FrameError::Truncated);
    };

    // Literal sentinels first: exact sixteen-bit matches.
    if tag == PFX_END_OF_FRAME {
      return Ok(Decoded { item: FrameItem::EndOfFrame, bytes: 2 });
    }
    if tag == PFX_NULL_CONTENT {
      return Ok(Decoded { item: FrameItem::NullContent, bytes: 2 });
    }
    if tag == PFX_DEADTIME_HSTAT_BINS {
      return decode_deadtime(body);
    }
    if tag == PFX_PEDESTAL_H_MD {
      return decode_tagged_words(body, FrameItem::PedestalHMd);
    }
    if tag == PFX_PEDESTAL_HSTAT {
      return decode_tagged_words(body, FrameItem::PedestalHstat);
    }
    if tag == PFX_SHISTO_BINS {
      return decode_tagged_words(body, FrameItem::ShistoBins);
    }
    if tag == PFX_CMD_STATISTICS {
      return decode_tagged_words(body, FrameItem::CmdStatistics);
    }
    if tag == PFX_PEDTHR_LIST {
      return decode_tagged_words(body, FrameItem::PedthrList);
    }
    if tag >= PFX_CH_HIT_CNT_HISTO_CHIP_IX_BASE
      && tag < PFX_CH_HIT_CNT_HISTO_CHIP_IX_BASE + crate::MAX_ASIC as u16
    {
      let chip = (tag - PFX_CH_HIT_CNT_HISTO_CHIP_IX_BASE) as u8;
      return decode_tagged_words(body, move |words| FrameItem::ChHitCntHistoChipIx { chip, words });
    }

    // 14-bit class.
    if tag & CARD_CHIP_CHAN_MASK == PFX_CARD_CHIP_CHAN_HIT_IX {
      let ccc = CardChipChan::unpack(tag & !CARD_CHIP_CHAN_MASK);
      return Ok(Decoded { item: FrameItem::HitIndex(ccc), bytes: 2 });
    }
    if tag & CARD_CHIP_CHAN_MASK == PFX_CARD_CHIP_CHAN_HIT_CNT {
      let ccc = CardChipChan::unpack(tag & !CARD_CHIP_CHAN_MASK);
      return Ok(Decoded { item: FrameItem::HitCount(ccc), bytes: 2 });
    }
    if tag & CARD_CHIP_CHAN_MASK == PFX_CARD_CHIP_CHAN_HISTO {
      let ccc = CardChipChan::unpack(tag & !CARD_CHIP_CHAN_MASK);
      return Ok(Decoded { item: FrameItem::HitHisto(ccc), bytes: 2 });
    }

    // 12-bit classes.
    if tag & TWELVE_BIT_MASK == PFX_ADC_SAMPLE {
      return Ok(Decoded { item: FrameItem::AdcSample(tag & 0x0FFF), bytes: 2 });
    }
    if tag & TWELVE_BIT_MASK == PFX_LAT_HISTO_BIN {
      let bin = tag & 0x0FFF;
      let lo = *body.get(1).ok_or(FrameError::Truncated)?;
      let hi = *body.get(2).ok_or(FrameError::Truncated)?;
      return Ok(Decoded { item: FrameItem::LatHistoBin { bin, content: unpack_u32(lo, hi) }, bytes: 6 });
    }

    // 9-bit class (body-only members; frame starts are peeled upstream).
    if tag & START_FRAME_MASK == PFX_TIME_BIN_IX {
      return Ok(Decoded { item: FrameItem::TimeBinIx(tag & 0x01FF), bytes: 2 });
    }
    if tag & START_FRAME_MASK == PFX_HISTO_BIN_IX {
      return Ok(Decoded { item: FrameItem::HistoBinIx(tag & 0x01FF), bytes: 2 });
    }

    // 8-bit ASCII class.
    if tag & ASCII_MSG_LEN_MASK == PFX_ASCII_MSG_LEN {
      return decode_ascii(body);
    }

    // 4-bit event class.
    if tag & EVENT_MASK == PFX_START_OF_EVENT {
      let (timestamp, event_count) = decode_event_tail(body)?;
      return Ok(Decoded { item: FrameItem::StartOfEvent { timestamp, event_count }, bytes: 12 });
    }
    if tag & EVENT_MASK == PFX_END_OF_EVENT {
      let (timestamp, event_count) = decode_event_tail(body)?;
      return Ok(Decoded { item: FrameItem::EndOfEvent { timestamp, event_count }, bytes: 12 });
    }

    Err(FrameError::UnknownItem(tag))
  }
}

fn decode_event_tail(body: &[u16]) -> Result<(u64, u32), FrameError> {
  if body.len() < 6 {
    return Err(FrameError::Truncated);
  }
  let timestamp = unpack_timestamp(body[1], body[2], body[3]);
  let event_count = unpack_u32(body[4], body[5]);
  Ok((timestamp, event_count))
}

fn encode_tagged_words(tag: u16, words: &WordVec, out: &mut heapless::Vec<u16, 512>) -> Result<(), FrameError> {
  out.push(tag).map_err(|_| FrameError::Capacity)?;
  out.push(words.len() as u16).map_err(|_| FrameError::Capacity)?;
  for w in words {
    out.push(*w).map_err(|_| FrameError::Capacity)?;
  }
  Ok(())
}

fn decode_tagged_words(
  body: &[u16],
  make: impl FnOnce(WordVec) -> FrameItem,
) -> Result<Decoded, FrameError> {
  let count = *body.get(1).ok_or(FrameError::Truncated)? as usize;
  if body.len() < 2 + count {
    return Err(FrameError::Truncated);
  }
  let mut words = WordVec::new();
  for &w in &body[2..2 + count] {
    words.push(w).map_err(|_| FrameError::Capacity)?;
  }
  Ok(Decoded { item: make(words), bytes: (2 + count) * 2 })
}

fn decode_deadtime(body: &[u16]) -> Result<Decoded, FrameError> {
  let needed = 1 + 2 + DEADTIME_HSTAT_FIELD_COUNT * 2;
  if body.len() < needed {
    return Err(FrameError::Truncated);
  }
  let header = [body[1], body[2]];
  let mut fields = [0u32; DEADTIME_HSTAT_FIELD_COUNT];
  for i in 0..DEADTIME_HSTAT_FIELD_COUNT {
    let lo = body[3 + 2 * i];
    let hi = body[4 + 2 * i];
    fields[i] = unpack_u32(lo, hi);
  }
  Ok(Decoded { item: FrameItem::DeadtimeHstatBins(DeadtimeHstat { header, fields }), bytes: needed * 2 })
}

fn encode_ascii_body(bytes: &[u8], out: &mut heapless::Vec<u16, 512>) -> Result<(), FrameError> {
  // String + a terminating NUL, padded with a second NUL to an even total.
  let mut padded = heapless::Vec::<u8, 512>::new();
  for &b in bytes {
    padded.push(b).map_err(|_| FrameError::Capacity)?;
  }
  padded.push(0).map_err(|_| FrameError::Capacity)?;
  if padded.len() % 2 != 0 {
    padded.push(0).map_err(|_| FrameError::Capacity)?;
  }
  for pair in padded.chunks(2) {
    out.push(u16::from_le_bytes([pair[0], pair[1]])).map_err(|_| FrameError::Capacity)?;
  }
  Ok(())
}

fn decode_ascii(body: &[u16]) -> Result<Decoded, FrameError> {
  let tag = body[0];
  let len = (tag & 0x00FF) as usize;
  // String + at least one NUL, padded to even total bytes.
  let raw_len = len + 1;
  let padded_len = raw_len + (raw_len % 2);
  let trailing_shorts = padded_len / 2;
  if body.len() < 1 + trailing_shorts {
    return Err(FrameError::Truncated);
  }
  let mut bytes = heapless::Vec::<u8, 512>::new();
  for &w in &body[1..1 + trailing_shorts] {
    let [lo, hi] = w.to_le_bytes();
    bytes.push(lo).map_err(|_| FrameError::Capacity)?;
    bytes.push(hi).map_err(|_| FrameError::Capacity)?;
  }
  let s = core::str::from_utf8(&bytes[..len]).map_err(|_| FrameError::BadAscii)?;
  let mut out = heapless::String::<240>::new();
  out.push_str(s).map_err(|_| FrameError::Capacity)?;
  Ok(Decoded { item: FrameItem::AsciiMsg(out), bytes: (1 + trailing_shorts) * 2 })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(item: FrameItem) {
    let mut buf = heapless::Vec::<u16, 512>::new();
    item.encode(&mut buf).expect("encode");
    let decoded = FrameItem::decode(&buf).expect("decode");
    assert_eq!(decoded.item, item);
    assert_eq!(decoded.bytes, buf.len() * 2);
    assert_eq!(decoded.bytes % 2, 0);
  }

  #[test]
  fn card_chip_chan_roundtrips() {
    let ccc = CardChipChan { card: 17, chip: 2, chan: 91 };
    roundtrip(FrameItem::HitIndex(ccc));
    roundtrip(FrameItem::HitCount(ccc));
    roundtrip(FrameItem::HitHisto(ccc));
  }

  #[test]
  fn adc_sample_roundtrips() {
    roundtrip(FrameItem::AdcSample(0xABC & 0x0FFF));
  }

  #[test]
  fn lat_histo_bin_roundtrips() {
    roundtrip(FrameItem::LatHistoBin { bin: 0x0123, content: 0xDEAD_BEEF });
  }

  #[test]
  fn ascii_msg_even_length_gets_one_extra_null() {
    // "hi" (2 bytes) + 1 NUL = 3 (odd) -> needs a second NUL -> 4 bytes -> 2 shorts.
    roundtrip(FrameItem::AsciiMsg(heapless::String::try_from("hi").unwrap()));
  }

  #[test]
  fn ascii_msg_odd_length_needs_no_extra_null() {
    // "odd" (3 bytes) + 1 NUL = 4 (even) already.
    roundtrip(FrameItem::AsciiMsg(heapless::String::try_from("odd").unwrap()));
  }

  #[test]
  fn start_and_end_of_event_roundtrip() {
    roundtrip(FrameItem::StartOfEvent { timestamp: 0x0000_1234_5678_9ABC, event_count: 42 });
    roundtrip(FrameItem::EndOfEvent { timestamp: 1, event_count: 0xFFFF_FFFF });
  }

  #[test]
  fn tagged_words_roundtrip() {
    let mut words = WordVec::new();
    for i in 0..10u16 {
      words.push(i * 3).unwrap();
    }
    roundtrip(FrameItem::PedestalHstat(words.clone()));
    roundtrip(FrameItem::ShistoBins(words.clone()));
    roundtrip(FrameItem::ChHitCntHistoChipIx { chip: 2, words });
  }

  #[test]
  fn deadtime_hstat_bins_roundtrip() {
    let d = DeadtimeHstat { header: [1, 2], fields: [10, 20, 30, 40, 50, 60, 70, 80, 90] };
    roundtrip(FrameItem::DeadtimeHstatBins(d));
  }

  #[test]
  fn truncated_body_is_an_error() {
    let body = [PFX_LAT_HISTO_BIN];
    assert_eq!(FrameItem::decode(&body), Err(FrameError::Truncated));
  }

  #[test]
  fn unknown_tag_is_an_error() {
    // Pick a tag outside every known class: low byte nonzero under no
    // recognized mask, and not a literal sentinel.
    let body = [0x2000u16];
    assert!(matches!(FrameItem::decode(&body), Err(FrameError::UnknownItem(_))));
  }
}
