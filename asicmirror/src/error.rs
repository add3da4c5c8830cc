//! Errors raised by the slow-control drivers (§4.2).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScError {
  /// `SC_REQ` was asserted but `SC_GRANT` never came back within the
  /// retry budget.
  NotGranted,
  /// A verified write read the register back and got a different value.
  VerifyMismatch,
  /// The register address has no known width for this chip family.
  UnknownRegister,
}

impl core::fmt::Display for ScError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      ScError::NotGranted => write!(f, "slow-control bus not granted"),
      ScError::VerifyMismatch => write!(f, "verified write read back a different value"),
      ScError::UnknownRegister => write!(f, "unknown register for this chip family"),
    }
  }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScError {
  fn format(&self, f: defmt::Formatter) {
    match self {
      ScError::NotGranted => defmt::write!(f, "ScError::NotGranted"),
      ScError::VerifyMismatch => defmt::write!(f, "ScError::VerifyMismatch"),
      ScError::UnknownRegister => defmt::write!(f, "ScError::UnknownRegister"),
    }
  }
}
