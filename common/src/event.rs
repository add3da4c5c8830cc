//! Built-event container (§4.3.2): the envelope the TCM produces by
//! concatenating one frame per participating Feminos.
//!
//! ```text
//! START_OF_BUILT_EVENT
//! SOBE_SIZE, size_lo_16, size_hi_16
//! [frame_1][frame_2]...[frame_N]
//! END_OF_BUILT_EVENT
//! ```
//!
//! The spec's prose ("size is the envelope byte count including the
//! five-short header... read exactly size − 6 further bytes after
//! SOBE_SIZE") does not reconcile arithmetically with its own four-line
//! diagram (a 4-short, 8-byte header: `START_OF_BUILT_EVENT`, `SOBE_SIZE`,
//! `size_lo`, `size_hi`). We follow the diagram: `size` counts that 8-byte
//! header plus every child frame, excluding the `END_OF_BUILT_EVENT`
//! sentinel itself. See DESIGN.md OQ-3.

use crate::error::FrameError;
use crate::frame::decode_header;
use crate::prefix::{PFX_END_OF_BUILT_EVENT, PFX_SOBE_SIZE, PFX_START_OF_BUILT_EVENT};

/// Maximum number of child frames (one per participating Feminos port).
pub const MAX_PORTS: usize = 24;

/// A decoded built event: the raw word slices of its child frames.
pub struct BuiltEvent<'a> {
  pub frames: heapless::Vec<&'a [u16], MAX_PORTS>,
}

/// Encode an envelope around already-encoded child frames.
pub fn encode_built_event(children: &[&[u16]], out: &mut heapless::Vec<u16, 4096>) -> Result<(), FrameError> {
  let body_words: usize = children.iter().map(|c| c.len()).sum();
  let body_bytes = body_words * 2;
  let header_bytes = 8u32; // START_OF_BUILT_EVENT + SOBE_SIZE + size_lo + size_hi
  let size = header_bytes + body_bytes as u32;

  out.push(PFX_START_OF_BUILT_EVENT).map_err(|_| FrameError::Capacity)?;
  out.push(PFX_SOBE_SIZE).map_err(|_| FrameError::Capacity)?;
  out.push((size & 0xFFFF) as u16).map_err(|_| FrameError::Capacity)?;
  out.push((size >> 16) as u16).map_err(|_| FrameError::Capacity)?;
  for child in children {
    for &w in *child {
      out.push(w).map_err(|_| FrameError::Capacity)?;
    }
  }
  out.push(PFX_END_OF_BUILT_EVENT).map_err(|_| FrameError::Capacity)?;
  Ok(())
}

/// Decode a built-event envelope, splitting the body into child frames by
/// reading each child's own declared size in turn.
pub fn decode_built_event(words: &[u16]) -> Result<BuiltEvent<'_>, FrameError> {
  let start = *words.first().ok_or(FrameError::Truncated)?;
  if start != PFX_START_OF_BUILT_EVENT {
    return Err(FrameError::UnknownStart);
  }
  let sobe = *words.get(1).ok_or(FrameError::Truncated)?;
  if sobe != PFX_SOBE_SIZE {
    return Err(FrameError::UnknownStart);
  }
  let size_lo = *words.get(2).ok_or(FrameError::Truncated)?;
  let size_hi = *words.get(3).ok_or(FrameError::Truncated)?;
  let size = (size_lo as u32) | ((size_hi as u32) << 16);

  let body_bytes = size.checked_sub(8).ok_or(FrameError::Truncated)? as usize;
  let body_words = body_bytes / 2;
  if words.len() < 4 + body_words + 1 {
    return Err(FrameError::Truncated);
  }
  let body = &words[4..4 + body_words];

  let mut frames = heapless::Vec::<&[u16], MAX_PORTS>::new();
  let mut cursor = body;
  while !cursor.is_empty() {
    let header = decode_header(cursor)?;
    let words_in_child = header.size as usize / 2;
    if words_in_child == 0 || words_in_child > cursor.len() {
      return Err(FrameError::Overrun);
    }
    frames.push(&cursor[..words_in_child]).map_err(|_| FrameError::Capacity)?;
    cursor = &cursor[words_in_child..];
  }

  if words[4 + body_words] != PFX_END_OF_BUILT_EVENT {
    return Err(FrameError::Truncated);
  }

  Ok(BuiltEvent { frames })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::{CFrame, MFrame};

  #[test]
  fn single_child_roundtrips() {
    let cf = CFrame::new(1, 0, "ok").unwrap();
    let encoded = cf.encode().unwrap();
    let mut out = heapless::Vec::<u16, 4096>::new();
    encode_built_event(&[&encoded[..]], &mut out).unwrap();
    let decoded = decode_built_event(&out).unwrap();
    assert_eq!(decoded.frames.len(), 1);
    assert_eq!(decoded.frames[0], &encoded[..]);
  }

  #[test]
  fn multiple_children_roundtrip() {
    let cf1 = CFrame::new(1, 0, "a").unwrap().encode().unwrap();
    let mf2 = MFrame::<4>::new(2, heapless::Vec::new()).encode().unwrap();
    let mut out = heapless::Vec::<u16, 4096>::new();
    encode_built_event(&[&cf1[..], &mf2[..]], &mut out).unwrap();
    let decoded = decode_built_event(&out).unwrap();
    assert_eq!(decoded.frames.len(), 2);
    assert_eq!(decoded.frames[0], &cf1[..]);
    assert_eq!(decoded.frames[1], &mf2[..]);
  }

  #[test]
  fn size_excludes_end_of_built_event_sentinel() {
    let cf = CFrame::new(0, 0, "z").unwrap().encode().unwrap();
    let mut out = heapless::Vec::<u16, 4096>::new();
    encode_built_event(&[&cf[..]], &mut out).unwrap();
    let size = (out[2] as u32) | ((out[3] as u32) << 16);
    // header(4 shorts) + child, in bytes; END_OF_BUILT_EVENT not included.
    assert_eq!(size as usize, (4 + cf.len()) * 2);
    assert_eq!(out.last(), Some(&PFX_END_OF_BUILT_EVENT));
  }
}
