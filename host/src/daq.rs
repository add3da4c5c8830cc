//! DAQ credit issuer (§4.4.1, §1 "companion host-side tooling"): the one
//! socket a card accepts `daq` grants from, reissuing credit on a fixed
//! interval until interrupted.

use std::time::Duration;
use tokio::time::{interval, Duration as TokioDuration};

use crate::client::Client;
use crate::Error;

#[derive(Debug, Clone, Copy)]
pub enum CreditUnit {
  Bytes,
  Frames,
}

impl CreditUnit {
  fn wire_letter(self) -> char {
    match self {
      CreditUnit::Bytes => 'b',
      CreditUnit::Frames => 'f',
    }
  }
}

/// Issue `amount` credits of `unit` every `period`, tagging each request
/// with an incrementing sequence number (§4.4.2) so the card can detect
/// a lost grant. Runs until `should_stop` returns `true`.
pub async fn run(
  client: &Client,
  amount: u32,
  unit: CreditUnit,
  period: Duration,
  reply_wait: Duration,
  mut should_stop: impl FnMut() -> bool,
) -> Result<(), Error> {
  let mut ticker = interval(TokioDuration::from_std(period).unwrap_or(TokioDuration::from_millis(1)));
  let mut seq: u8 = 0;
  loop {
    ticker.tick().await;
    if should_stop() {
      return Ok(());
    }
    let line = format!("daq {} {} {}", amount, unit.wire_letter(), seq);
    seq = seq.wrapping_add(1);
    let reply = client.command(&line, reply_wait).await?;
    if reply.error_code != 0 {
      tracing::warn!(error_code = reply.error_code, message = %reply.message, "daq grant rejected");
    }
  }
}
