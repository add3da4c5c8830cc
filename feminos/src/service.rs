//! The single-threaded service loop (§4.7) and the `Service` aggregate
//! that owns every piece of card state (§9 design note: "aggregate
//! them into a single owning `Service` value constructed in `main`").
//!
//! §5's concurrency model is explicitly non-preemptive and yield-free:
//! the thread never suspends across an await point, so `Service::step`
//! is a plain synchronous function the platform's `main` calls in a
//! tight loop, not an async task against an executor. See DESIGN.md for
//! the `embassy-executor` drop rationale.

use common::item::FrameItem;
use regbank::RegisterBank;
use ringbuf::{BlockPool, BufferId, RingHw, RingPump, MAX_BUFFER_CAPACITY_BYTES, SW_PREFIX_OFFSET};

use crate::hw::EthernetHw;
use cmdi::{AsicState, CommandContext, PedThrLut, Reply, Sinks};

const MAX_RX_BYTES: usize = 512;
const MAX_BUFFER_WORDS: usize = (MAX_BUFFER_CAPACITY_BYTES / 2) as usize;
const MAX_BUFFER_BYTES: usize = MAX_BUFFER_CAPACITY_BYTES as usize;
/// Reply blocks staged concurrently: one in flight per command socket is
/// already generous since the service loop answers one command per `step`.
const REPLY_POOL_SIZE: usize = 4;

fn decode_ascii(bytes: &[u8]) -> &str {
  let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
  core::str::from_utf8(&bytes[..end]).unwrap_or("")
}

/// One card's worth of state: the ring pump handle, the command
/// interpreter context, the pedestal/threshold LUT, the register bank
/// and ASIC mirrors `reg`/`after`/`aget`/`pul`/`sca` drive, and the
/// histogram sinks the local-consumption sinks feed. `R`, `E`, `L`,
/// `B` are the hardware/platform trait boundary: everything above this
/// line is the testable core, everything `R`/`E`/`L`/`B` stand in for
/// is the out-of-scope platform glue (§1 Non-goals).
pub struct Service<R: RingHw, E: EthernetHw, L: PedThrLut, B: RegisterBank> {
  hw: R,
  eth: E,
  lut: L,
  regbank: B,
  asic: AsicState,
  pump: RingPump,
  base: u32,
  ctx: CommandContext,
  sinks: Sinks,
  card_id: u8,
  /// Reply staging blocks (§3.4): command replies are built up here
  /// rather than on the stack, the same software-pool path real
  /// payload buffers would use once `reg`/bulk replies grow past one
  /// datagram.
  reply_pool: BlockPool<REPLY_POOL_SIZE>,
}

impl<R: RingHw, E: EthernetHw, L: PedThrLut, B: RegisterBank> Service<R, E, L, B> {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    mut hw: R,
    eth: E,
    lut: L,
    regbank: B,
    card_id: u8,
    base: u32,
    buf_capacity: u16,
    ctx: CommandContext,
  ) -> Result<Self, ringbuf::RingError> {
    let mut pump = RingPump::new();
    pump.init(&mut hw, base, buf_capacity)?;
    Ok(Service {
      hw,
      eth,
      lut,
      regbank,
      asic: AsicState::new(),
      pump,
      base,
      ctx,
      sinks: Sinks::new(),
      card_id,
      reply_pool: BlockPool::new(),
    })
  }

  pub fn context(&self) -> &CommandContext {
    &self.ctx
  }

  /// Run the five steps of §4.7 once. The platform `main` loops this
  /// forever; tests call it directly to assert on one iteration.
  pub fn step(&mut self, now: u64) {
    self.poll_command(now);
    self.eth.check_tx();
    self.drain_one_buffer(now);
    self.periodic_check(now);
    self.eth.output_tcp();
  }

  fn poll_command(&mut self, now: u64) {
    let mut rx = [0u8; MAX_RX_BYTES];
    let Some(n) = self.eth.recv_udp(&mut rx) else {
      return;
    };
    let line = decode_ascii(&rx[..n]);
    let reply = cmdi::dispatch(
      &mut self.ctx,
      &mut self.lut,
      &mut self.sinks,
      &mut self.asic,
      &mut self.regbank,
      self.card_id,
      now,
      line,
    );
    self.send_reply(&reply);
  }

  /// Encode and transmit `reply`'s datagram, if it has one. A
  /// credit-adding `daq` produces `Reply::None` (§4.4.1): nothing goes
  /// out, matching the wire behavior the command interpreter already
  /// enforces.
  fn send_reply(&mut self, reply: &Reply) {
    let words = match reply {
      Reply::None => return,
      Reply::Cframe(frame) => frame.encode(),
      Reply::Mframe(frame) => frame.encode(),
    };
    let Ok(words) = words else { return };
    let Some(idx) = self.reply_pool.acquire() else {
      // Pool exhausted: every staged reply is still in flight. Drop this
      // one rather than block the loop (§5 non-preemptive: there is no
      // waiting point to yield to).
      return;
    };
    let block = self.reply_pool.block_mut(idx);
    for word in &words {
      if block.data.extend_from_slice(&word.to_le_bytes()).is_err() {
        break;
      }
    }
    self.eth.send_udp(&block.data);
    self.reply_pool.release(idx);
  }

  fn drain_one_buffer(&mut self, now: u64) {
    use cmdi::ServeTarget;
    let Some(id) = self.pump.get_filled(&mut self.hw) else {
      return;
    };
    match self.ctx.serve_target {
      ServeTarget::Null => self.free_buffer(id),
      ServeTarget::Daq => {
        if self.ctx.flow.can_send() {
          self.transmit_data_frame(id, now);
        }
        // Not enough credit: the buffer stays in the filled FIFO (the
        // hardware side) until the next `daq` grant arrives: nothing
        // further to do this iteration (§4.4.1).
      }
      ServeTarget::PedHisto => {
        self.decode_into_sink(id, true);
        self.free_buffer(id);
      }
      ServeTarget::HitHisto => {
        self.decode_into_sink(id, false);
        self.free_buffer(id);
      }
    }
  }

  fn free_buffer(&mut self, id: BufferId) {
    let addr = id.to_addr(self.pump_base());
    self.pump.post_free(&mut self.hw, addr);
  }

  fn pump_base(&self) -> u32 {
    self.base
  }

  fn transmit_data_frame(&mut self, id: BufferId, now: u64) {
    let framed = self.pump.frame_filled(&mut self.hw, id, self.card_id);
    let addr = framed.to_addr(self.pump_base()) + SW_PREFIX_OFFSET;
    let word_count = (framed.size() as usize) / 2;
    let mut buf: heapless::Vec<u8, MAX_BUFFER_BYTES> = heapless::Vec::new();
    for i in 0..word_count {
      let word = self.hw.read_u16(addr + (i as u32) * 2);
      if buf.extend_from_slice(&word.to_le_bytes()).is_err() {
        break;
      }
    }
    self.eth.send_udp(&buf);
    self.ctx.flow.on_data_frame_sent(now, framed.size() as u32);
    self.free_buffer(framed);
  }

  fn decode_into_sink(&mut self, id: BufferId, pedestal: bool) {
    // Hardware always leaves the 4-byte software-prefix placeholder ahead
    // of the real payload (§4.1 algorithm), whether or not this buffer is
    // ever routed through `frame_filled`; the samples proper start right
    // after it.
    let addr = id.to_addr(self.pump_base()) + SW_PREFIX_OFFSET + 4;
    let payload_bytes = (id.size() as usize).saturating_sub(4);
    let word_count = core::cmp::min(payload_bytes / 2, MAX_BUFFER_WORDS);
    let mut words: heapless::Vec<u16, MAX_BUFFER_WORDS> = heapless::Vec::new();
    for i in 0..word_count {
      if words.push(self.hw.read_u16(addr + (i as u32) * 2)).is_err() {
        break;
      }
    }
    let mut cursor: &[u16] = &words;
    while !cursor.is_empty() {
      let Ok(decoded) = FrameItem::decode(cursor) else { break };
      let item = decoded.item;
      let consumed_words = decoded.bytes / 2;
      if consumed_words == 0 || consumed_words > cursor.len() {
        break;
      }
      cursor = &cursor[consumed_words..];
      let is_end = matches!(item, FrameItem::EndOfFrame);
      if pedestal {
        self.sinks.pedestal.feed(&item);
      } else {
        self.sinks.hitrate.feed(&item);
      }
      if is_end {
        break;
      }
    }
  }

  fn periodic_check(&mut self, now: u64) {
    let _ = self.ctx.flow.periodic_check(now);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cmdi::{CommandContext, SimPedThrLut};
  use flowctl::{CreditUnit, FlowController, LossPolicy};
  use ringbuf::SimRingHw;

  /// In-memory `EthernetHw` fake: one pending inbound datagram, all
  /// outbound datagrams captured for assertions.
  struct FakeEthernet {
    inbox: Option<heapless::Vec<u8, 64>>,
    outbox: heapless::Vec<heapless::Vec<u8, 1024>, 8>,
    tx_checks: u32,
    tcp_flushes: u32,
  }

  impl FakeEthernet {
    fn new() -> Self {
      FakeEthernet { inbox: None, outbox: heapless::Vec::new(), tx_checks: 0, tcp_flushes: 0 }
    }

    fn queue(&mut self, line: &str) {
      let mut v = heapless::Vec::new();
      let _ = v.extend_from_slice(line.as_bytes());
      let _ = v.push(0);
      self.inbox = Some(v);
    }
  }

  impl EthernetHw for FakeEthernet {
    fn recv_udp(&mut self, buf: &mut [u8]) -> Option<usize> {
      let datagram = self.inbox.take()?;
      let n = datagram.len().min(buf.len());
      buf[..n].copy_from_slice(&datagram[..n]);
      Some(n)
    }

    fn send_udp(&mut self, bytes: &[u8]) {
      let mut v = heapless::Vec::new();
      let _ = v.extend_from_slice(bytes);
      let _ = self.outbox.push(v);
    }

    fn check_tx(&mut self) {
      self.tx_checks += 1;
    }

    fn output_tcp(&mut self) {
      self.tcp_flushes += 1;
    }
  }

  fn new_service() -> Service<SimRingHw, FakeEthernet, SimPedThrLut, regbank::SimRegisterBank<4>> {
    let flow = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 1000);
    let ctx = CommandContext::new(flow);
    Service::new(
      SimRingHw::new(),
      FakeEthernet::new(),
      SimPedThrLut::new(),
      regbank::SimRegisterBank::<4>::new(),
      3,
      0x1000_0000,
      1024,
      ctx,
    )
    .expect("ring init: capacity within hardware maximum")
  }

  #[test]
  fn a_command_datagram_produces_a_reply_datagram() {
    let mut svc = new_service();
    svc.eth.queue("version");
    svc.step(0);
    assert_eq!(svc.eth.outbox.len(), 1);
  }

  #[test]
  fn a_daq_grant_is_reflected_in_the_context() {
    let mut svc = new_service();
    svc.eth.queue("daq 5 f");
    svc.step(0);
    assert_eq!(svc.context().flow.snd_allowed(), 5);
    assert!(svc.eth.outbox.is_empty(), "a credit grant gets no reply datagram");
  }

  #[test]
  fn every_step_polls_tx_completion_and_flushes_tcp() {
    let mut svc = new_service();
    svc.step(0);
    assert_eq!(svc.eth.tx_checks, 1);
    assert_eq!(svc.eth.tcp_flushes, 1);
  }

  #[test]
  fn a_null_served_filled_buffer_is_returned_to_the_free_fifo() {
    let mut svc = new_service();
    svc.hw.simulate_fill(128);
    let before = svc.hw.free_fifo_len();
    svc.step(0);
    assert_eq!(svc.hw.free_fifo_len(), before + 1);
  }

  #[test]
  fn a_daq_served_filled_buffer_is_transmitted_when_credit_allows() {
    let mut svc = new_service();
    svc.ctx.serve_target = cmdi::ServeTarget::Daq;
    svc.ctx.flow.daq_request(10, CreditUnit::Frames, None, 0);
    svc.hw.simulate_fill(64);
    svc.step(0);
    assert_eq!(svc.eth.outbox.len(), 1);
  }

  #[test]
  fn a_daq_served_buffer_is_held_back_without_credit() {
    let mut svc = new_service();
    svc.ctx.serve_target = cmdi::ServeTarget::Daq;
    svc.hw.simulate_fill(64);
    svc.step(0);
    assert!(svc.eth.outbox.is_empty());
  }
}
