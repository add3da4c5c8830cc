//! Running counters carried in the flow-control half of the command
//! context (§3.6).

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowCounters {
  /// DAQ requests that arrived while `CredReturnTimedOut` (§4.4.2/§4.4.4).
  pub rx_daq_delayed: u32,
  /// Requests inferred lost by a sequence-number gap (§4.4.2).
  pub daq_miss_cnt: u32,
  /// Data frames transmitted to the DAQ consumer.
  pub tx_count: u32,
}
