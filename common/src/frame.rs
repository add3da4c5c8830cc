//! Whole-frame framing: peeling the start prefix (§3.5, §6.1), and the two
//! frame shapes the command interpreter emits: the scalar configuration
//! reply (§4.3.3) and the multi-purpose container (§4.3.4). Data-frame
//! *headers* (the two words the ring pump stamps onto a hardware-filled
//! buffer, §4.1) live here too; decoding a data frame's body reuses the
//! same generic item loop as a multi-purpose frame, since both are
//! terminated by `END_OF_FRAME` and built from the same prefix taxonomy.

use crate::error::FrameError;
use crate::item::{Decoded, FrameItem};
use crate::prefix::*;
use crate::PROTOCOL_VERSION;

/// Which of the three frame families a start prefix denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
  Data,
  Multi,
  Config,
}

/// Common header fields every frame starts with (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
  pub kind: FrameKind,
  pub version: u8,
  pub card_id: u8,
  /// Total frame size in bytes, including the start and size shorts.
  pub size: u16,
}

fn start_word(kind: FrameKind, version: u8, card_id: u8) -> u16 {
  let base = match kind {
    FrameKind::Data => PFX_START_OF_DFRAME,
    FrameKind::Multi => PFX_START_OF_MFRAME,
    FrameKind::Config => PFX_START_OF_CFRAME,
  };
  base | (((version & 0x0F) as u16) << 5) | ((card_id & 0x1F) as u16)
}

/// Peel the two-short header off the front of `words`. Does not consume
/// anything beyond validating; callers slice `words[2..]` for the body.
pub fn decode_header(words: &[u16]) -> Result<FrameHeader, FrameError> {
  let tag = *words.first().ok_or(FrameError::Truncated)?;
  let kind = if tag & START_FRAME_MASK == PFX_START_OF_DFRAME {
    FrameKind::Data
  } else if tag & START_FRAME_MASK == PFX_START_OF_MFRAME {
    FrameKind::Multi
  } else if tag & START_FRAME_MASK == PFX_START_OF_CFRAME {
    FrameKind::Config
  } else {
    return Err(FrameError::UnknownStart);
  };
  let version = ((tag >> 5) & 0x0F) as u8;
  let card_id = (tag & 0x1F) as u8;
  let size = *words.get(1).ok_or(FrameError::Truncated)?;
  if size % 2 != 0 {
    return Err(FrameError::OddSize);
  }
  Ok(FrameHeader { kind, version, card_id, size })
}

/// Decode items from a frame body until `END_OF_FRAME`/`END_OF_BUILT_EVENT`
/// or the declared byte budget is exhausted (§4.3.1 "Sink-independent
/// decoder"). `body_bytes` is the number of bytes in `words[2..]` that
/// belong to this frame, i.e. `header.size - 4`.
pub fn decode_items<const N: usize>(
  words: &[u16],
  body_bytes: usize,
) -> Result<heapless::Vec<FrameItem, N>, FrameError> {
  let mut items = heapless::Vec::new();
  let mut cursor = &words[2..];
  let mut consumed = 0usize;
  loop {
    if consumed >= body_bytes {
      break;
    }
    let Decoded { item, bytes } = FrameItem::decode(cursor)?;
    consumed += bytes;
    if consumed > body_bytes {
      return Err(FrameError::Overrun);
    }
    cursor = &cursor[bytes / 2..];
    let is_end = matches!(item, FrameItem::EndOfFrame);
    items.push(item).map_err(|_| FrameError::Capacity)?;
    if is_end {
      break;
    }
  }
  Ok(items)
}

/// Encode a sequence of items as a frame body, patching the size word once
/// the terminating `END_OF_FRAME` has been appended.
fn encode_framed(
  kind: FrameKind,
  version: u8,
  card_id: u8,
  body: impl FnOnce(&mut heapless::Vec<u16, 512>) -> Result<(), FrameError>,
) -> Result<heapless::Vec<u16, 512>, FrameError> {
  let mut out = heapless::Vec::<u16, 512>::new();
  out.push(start_word(kind, version, card_id)).map_err(|_| FrameError::Capacity)?;
  out.push(0).map_err(|_| FrameError::Capacity)?; // size placeholder
  body(&mut out)?;
  FrameItem::EndOfFrame.encode(&mut out)?;
  let size = (out.len() * 2) as u16;
  out[1] = size;
  Ok(out)
}

/// Scalar configuration-reply frame (§4.3.3): an error code and a
/// human-readable message, one per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CFrame {
  pub version: u8,
  pub card_id: u8,
  pub error_code: i16,
  pub message: heapless::String<240>,
}

impl CFrame {
  pub fn new(card_id: u8, error_code: i16, message: &str) -> Result<Self, FrameError> {
    let mut s = heapless::String::<240>::new();
    s.push_str(message).map_err(|_| FrameError::Capacity)?;
    Ok(CFrame { version: PROTOCOL_VERSION, card_id, error_code, message: s })
  }

  pub fn encode(&self) -> Result<heapless::Vec<u16, 512>, FrameError> {
    encode_framed(FrameKind::Config, self.version, self.card_id, |out| {
      out.push(self.error_code as u16).map_err(|_| FrameError::Capacity)?;
      FrameItem::AsciiMsg(self.message.clone()).encode(out)?;
      Ok(())
    })
  }

  pub fn decode(words: &[u16]) -> Result<Self, FrameError> {
    let header = decode_header(words)?;
    if header.kind != FrameKind::Config {
      return Err(FrameError::UnknownStart);
    }
    let error_code = *words.get(2).ok_or(FrameError::Truncated)? as i16;
    let Decoded { item, bytes } = FrameItem::decode(&words[3..]).map_err(|_| FrameError::Truncated)?;
    let message = match item {
      FrameItem::AsciiMsg(s) => s,
      _ => return Err(FrameError::BadAscii),
    };
    let eof_words = &words[3 + bytes / 2..];
    let Decoded { item: eof_item, .. } = FrameItem::decode(eof_words)?;
    if !matches!(eof_item, FrameItem::EndOfFrame) {
      return Err(FrameError::Truncated);
    }
    Ok(CFrame { version: header.version, card_id: header.card_id, error_code, message })
  }
}

/// Multi-purpose frame (§4.3.4): register dumps, command statistics,
/// pedestal/hit/S-curve/busy histograms, pedestal/threshold lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MFrame<const N: usize = 32> {
  pub version: u8,
  pub card_id: u8,
  pub items: heapless::Vec<FrameItem, N>,
}

impl<const N: usize> MFrame<N> {
  pub fn new(card_id: u8, items: heapless::Vec<FrameItem, N>) -> Self {
    MFrame { version: PROTOCOL_VERSION, card_id, items }
  }

  pub fn encode(&self) -> Result<heapless::Vec<u16, 512>, FrameError> {
    encode_framed(FrameKind::Multi, self.version, self.card_id, |out| {
      for item in &self.items {
        item.encode(out)?;
      }
      Ok(())
    })
  }

  pub fn decode(words: &[u16]) -> Result<Self, FrameError> {
    let header = decode_header(words)?;
    if header.kind != FrameKind::Multi {
      return Err(FrameError::UnknownStart);
    }
    let items: heapless::Vec<FrameItem, N> = decode_items(words, header.size as usize - 4)?;
    Ok(MFrame { version: header.version, card_id: header.card_id, items })
  }
}

/// The two-word header the ring buffer pump stamps onto a hardware-filled
/// buffer in place (§4.1): `{PFX_START_OF_DFRAME|version|card_id, size}`.
pub struct DFrameHeader {
  pub version: u8,
  pub card_id: u8,
  pub size: u16,
}

impl DFrameHeader {
  pub fn encode_into(&self, buf: &mut [u8], offset: usize) -> Result<(), FrameError> {
    let word = start_word(FrameKind::Data, self.version, self.card_id);
    let bytes = buf.get_mut(offset..offset + 4).ok_or(FrameError::Capacity)?;
    bytes[0..2].copy_from_slice(&word.to_le_bytes());
    bytes[2..4].copy_from_slice(&self.size.to_le_bytes());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cframe_roundtrips() {
    let cf = CFrame::new(7, 0, "Fem(00) Reg(0) <- 0xdeadbeef").unwrap();
    let encoded = cf.encode().unwrap();
    assert_eq!(encoded.len() % 1, 0);
    assert_eq!((encoded.len() * 2) % 2, 0);
    let decoded = CFrame::decode(&encoded).unwrap();
    assert_eq!(decoded, cf);
  }

  #[test]
  fn cframe_negative_error_code_roundtrips() {
    let cf = CFrame::new(1, -11, "verify mismatch").unwrap();
    let encoded = cf.encode().unwrap();
    let decoded = CFrame::decode(&encoded).unwrap();
    assert_eq!(decoded.error_code, -11);
  }

  #[test]
  fn mframe_roundtrips_mixed_items() {
    let mut items = heapless::Vec::<FrameItem, 32>::new();
    items.push(FrameItem::AdcSample(0x0AB)).unwrap();
    items.push(FrameItem::HitIndex(crate::CardChipChan { card: 1, chip: 0, chan: 5 })).unwrap();
    let mf = MFrame::<32>::new(3, items.clone());
    let encoded = mf.encode().unwrap();
    let decoded = MFrame::<32>::decode(&encoded).unwrap();
    // decoded.items includes the trailing EndOfFrame item; compare the
    // user-supplied prefix only.
    assert_eq!(&decoded.items[..items.len()], &items[..]);
    assert_eq!(decoded.items.last(), Some(&FrameItem::EndOfFrame));
  }

  #[test]
  fn every_frame_size_is_even() {
    let cf = CFrame::new(0, 0, "x").unwrap();
    let encoded = cf.encode().unwrap();
    let header = decode_header(&encoded).unwrap();
    assert_eq!(header.size % 2, 0);
    assert_eq!(header.size as usize, encoded.len() * 2);
  }

  #[test]
  fn unknown_start_prefix_is_rejected() {
    let words = [0x0000u16, 0, 0, 0];
    assert_eq!(decode_header(&words), Err(FrameError::UnknownStart));
  }

  #[test]
  fn dframe_header_writes_in_place() {
    let mut buf = [0u8; 64];
    let header = DFrameHeader { version: 1, card_id: 5, size: 128 };
    header.encode_into(&mut buf, 44).unwrap();
    let word = u16::from_le_bytes([buf[44], buf[45]]);
    assert_eq!(word & START_FRAME_MASK, PFX_START_OF_DFRAME);
    assert_eq!(word & 0x1F, 5);
    assert_eq!(u16::from_le_bytes([buf[46], buf[47]]), 128);
  }
}
