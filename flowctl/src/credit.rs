//! Credit accounting (§4.4.1): the consumer grants a budget in one of
//! two units, the card spends it one data frame at a time.

/// `hex-amount == 0xFFFFFF` is the pause sentinel, not a credit grant.
pub const PAUSE_AMOUNT: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CreditUnit {
  /// Credit is a byte budget.
  Bytes,
  /// Credit is a frame-count budget.
  Frames,
}

impl CreditUnit {
  pub const fn from_letter(letter: u8) -> Option<Self> {
    match letter {
      b'B' | b'b' => Some(CreditUnit::Bytes),
      b'F' | b'f' => Some(CreditUnit::Frames),
      _ => None,
    }
  }

  pub const fn letter(self) -> u8 {
    match self {
      CreditUnit::Bytes => b'B',
      CreditUnit::Frames => b'F',
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn letter_round_trips() {
    assert_eq!(CreditUnit::from_letter(b'B'), Some(CreditUnit::Bytes));
    assert_eq!(CreditUnit::from_letter(b'F'), Some(CreditUnit::Frames));
    assert_eq!(CreditUnit::from_letter(b'x'), None);
  }
}
