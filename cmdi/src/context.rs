//! Per-card command context (§3.6): created once at boot,
//! zero-initialized, mutated only by the single-writer service loop.

use common::MAX_ASIC;
use flowctl::FlowController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServeTarget {
  Null,
  Daq,
  PedHisto,
  HitHisto,
}

impl ServeTarget {
  pub const fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(ServeTarget::Null),
      1 => Some(ServeTarget::Daq),
      2 => Some(ServeTarget::PedHisto),
      3 => Some(ServeTarget::HitHisto),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipMode {
  After,
  Aget,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counters {
  pub rx_count: u32,
  pub tx_count: u32,
  pub err_cmd_cnt: u32,
  pub miss_count: u32,
}

pub struct CommandContext {
  pub flow: FlowController,
  pub serve_target: ServeTarget,
  pub mode: ChipMode,
  pub polarity: [bool; MAX_ASIC],
  pub tstamp_is_set: bool,
  pub test_data_enabled: bool,
  pub counters: Counters,
}

impl CommandContext {
  pub fn new(flow: FlowController) -> Self {
    CommandContext {
      flow,
      serve_target: ServeTarget::Null,
      mode: ChipMode::After,
      polarity: [false; MAX_ASIC],
      tstamp_is_set: false,
      test_data_enabled: false,
      counters: Counters::default(),
    }
  }

  /// `clr tstamp`.
  pub fn clear_tstamp(&mut self) {
    self.tstamp_is_set = false;
  }

  /// `clr evcnt`.
  pub fn clear_evcnt(&mut self) {
    self.counters = Counters::default();
  }
}
