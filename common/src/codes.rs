//! Error codes carried in the second short of a configuration-reply frame
//! (§4.3.3, §4.5, §7). Zero means success; every negative value increments
//! `err_cmd_cnt` in the command context (§3.6).

/// Error taxonomy shared by the command interpreter and the service loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
  Ok,
  UnknownCommand,
  IllegalParameter,
  Syntax,
  VerifyMismatch,
  ScNotGranted,
  NotSupported,
  FormatError,
  IoFailure,
  FlowTimeout,
}

impl ErrorCode {
  /// Numeric value as it appears on the wire (§7 taxonomy table, §4.5
  /// "Error codes").
  pub const fn value(self) -> i16 {
    match self {
      ErrorCode::Ok => 0,
      ErrorCode::UnknownCommand => -1,
      ErrorCode::IllegalParameter => -2,
      ErrorCode::Syntax => -10,
      ErrorCode::VerifyMismatch => -11,
      ErrorCode::ScNotGranted => -20,
      ErrorCode::NotSupported => -30,
      ErrorCode::FormatError => -40,
      ErrorCode::IoFailure => -41,
      ErrorCode::FlowTimeout => -42,
    }
  }

  pub const fn is_error(self) -> bool {
    self.value() < 0
  }
}

impl core::fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let text = match self {
      ErrorCode::Ok => "ok",
      ErrorCode::UnknownCommand => "unknown command",
      ErrorCode::IllegalParameter => "illegal parameter",
      ErrorCode::Syntax => "syntax error",
      ErrorCode::VerifyMismatch => "verify mismatch",
      ErrorCode::ScNotGranted => "slow control not granted",
      ErrorCode::NotSupported => "not supported",
      ErrorCode::FormatError => "format error",
      ErrorCode::IoFailure => "I/O failure",
      ErrorCode::FlowTimeout => "flow control timeout",
    };
    write!(f, "{text}")
  }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ErrorCode {
  fn format(&self, f: defmt::Formatter) {
    defmt::write!(f, "{}", self.value())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_values_match_spec() {
    assert_eq!(ErrorCode::Ok.value(), 0);
    assert_eq!(ErrorCode::UnknownCommand.value(), -1);
    assert_eq!(ErrorCode::IllegalParameter.value(), -2);
    assert_eq!(ErrorCode::Syntax.value(), -10);
    assert_eq!(ErrorCode::VerifyMismatch.value(), -11);
    assert_eq!(ErrorCode::ScNotGranted.value(), -20);
    assert_eq!(ErrorCode::NotSupported.value(), -30);
  }

  #[test]
  fn only_ok_is_not_an_error() {
    assert!(!ErrorCode::Ok.is_error());
    assert!(ErrorCode::Syntax.is_error());
  }
}
