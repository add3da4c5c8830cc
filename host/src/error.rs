//! Host-side error type (§10.2): `anyhow` at the CLI boundary, `thiserror`
//! for the library-ish pieces underneath, mirroring the pairing
//! `aero-disk-convert` and the `disk-gateway` server use in the pack.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("socket I/O: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed reply from card: {0:?}")]
  Frame(common::FrameError),

  #[error("reply datagram had an odd byte count ({0})")]
  OddDatagram(usize),

  #[error("no reply received within the timeout")]
  Timeout,

  #[error("config file {path}: {source}")]
  Config { path: String, #[source] source: toml::de::Error },
}

impl From<common::FrameError> for Error {
  fn from(e: common::FrameError) -> Self {
    Error::Frame(e)
  }
}
