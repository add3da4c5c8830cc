#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt_rtt as _;
use panic_probe as _;

use cmdi::{CommandContext, SimPedThrLut};
use feminos::{EthernetHw, Service};
use flowctl::{CreditUnit, FlowController, LossPolicy};
use regbank::SimRegisterBank;
use ringbuf::SimRingHw;

/// Number of 32-bit registers backing the SC shift-bus control word
/// and any other platform registers the command interpreter reaches
/// (§1 Non-goals: the real AXI-mapped register file is board glue).
const REGISTER_COUNT: usize = 16;

/// Card identity and boot-time defaults (§6.3 covers the persistent
/// minibios record this would normally come from; out of scope per
/// §1, so `feminos` takes compile-time constants instead).
const CARD_ID: u8 = 0;
const RING_BASE: u32 = 0x1000_0000;
const RING_CAPACITY: u16 = 64;
const DEFAULT_CRED_WAIT_TICKS: u64 = 10_000;

/// Stand-in for the board's UDP/telnet glue (§1 Non-goals: the Xilinx
/// SDK peripheral wrappers and minibios networking stack). A real
/// platform wires in lwIP or `embassy-net`; until then `feminos` never
/// receives a datagram, so [`Service::step`] always falls through
/// `poll_command` to the ring pump.
struct NoEthernet;

impl EthernetHw for NoEthernet {
  fn recv_udp(&mut self, _buf: &mut [u8]) -> Option<usize> {
    None
  }

  fn send_udp(&mut self, _bytes: &[u8]) {}

  fn check_tx(&mut self) {}

  fn output_tcp(&mut self) {}
}

/// §5's service loop is explicitly non-preemptive and yield-free, so
/// `main` never hands control to an async executor: it calls
/// [`Service::step`] in a plain `loop`, advancing `now` from a free
/// running counter rather than a calibrated clock (the AXI timer that
/// would back a real tick count is out-of-scope platform glue).
#[entry]
fn main() -> ! {
  defmt::info!("feminos starting, card_id={}", CARD_ID);

  let hw = SimRingHw::new();
  let eth = NoEthernet;
  let lut = SimPedThrLut::new();
  let regbank = SimRegisterBank::<REGISTER_COUNT>::new();
  let flow = FlowController::new(CreditUnit::Frames, LossPolicy::ReCredit, DEFAULT_CRED_WAIT_TICKS);
  let ctx = CommandContext::new(flow);
  let mut service = match Service::new(hw, eth, lut, regbank, CARD_ID, RING_BASE, RING_CAPACITY, ctx) {
    Ok(service) => service,
    Err(e) => {
      defmt::error!("ring init failed: {}", defmt::Debug2Format(&e));
      loop {
        cortex_m::asm::nop();
      }
    }
  };

  let mut now: u64 = 0;
  loop {
    service.step(now);
    now = now.wrapping_add(1);
  }
}
