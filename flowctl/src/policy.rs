//! Loss recovery policies (§4.4.3), applied inside `periodic_check` once
//! a credit-wait timeout has elapsed with unit `'F'`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LossPolicy {
  /// Clear `last_daq_sent`. No retry.
  Ignore = 0,
  /// `snd_allowed += 1`; clear `last_daq_sent`.
  ReCredit = 1,
  /// `snd_allowed += 1`; resend the last data frame instead of reaping
  /// a new buffer.
  ReSend = 2,
}

impl LossPolicy {
  pub const fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(LossPolicy::Ignore),
      1 => Some(LossPolicy::ReCredit),
      2 => Some(LossPolicy::ReSend),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_code_is_rejected() {
    assert_eq!(LossPolicy::from_code(3), None);
  }
}
