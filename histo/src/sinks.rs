//! Histogram sinks (§2, §3.8): pedestal, hit-rate, S-curve, busy and
//! event-period accumulators, each fed by the decoded
//! [`common::FrameItem`] stream rather than branching on raw bits
//! itself (§9 grounding note "sinks ... consume the iterator rather
//! than branching on bits themselves").

use common::{CardChipChan, FrameItem, MAX_ASIC, MAX_CHANNEL};

use crate::histogram::{Histogram, Stats};

/// A `(asic, channel)` grid of identically-shaped histograms.
#[derive(Clone, Copy)]
pub struct ChannelGrid<const BINS: usize> {
  histos: [[Histogram<BINS>; MAX_CHANNEL]; MAX_ASIC],
}

impl<const BINS: usize> ChannelGrid<BINS> {
  pub const fn new(min_bin: i32, max_bin: i32, bin_width: i32) -> Self {
    ChannelGrid {
      histos: [[Histogram::new(min_bin, max_bin, bin_width); MAX_CHANNEL]; MAX_ASIC],
    }
  }

  pub fn get(&self, asic: usize, chan: usize) -> &Histogram<BINS> {
    &self.histos[asic][chan]
  }

  pub fn get_mut(&mut self, asic: usize, chan: usize) -> &mut Histogram<BINS> {
    &mut self.histos[asic][chan]
  }

  pub fn clear_all(&mut self) {
    for row in &mut self.histos {
      for h in row {
        h.clear();
      }
    }
  }

  pub fn clear_one(&mut self, asic: usize, chan: usize) {
    self.histos[asic][chan].clear();
  }
}

/// Pedestal histogram (§6.2 `hped`): one bin set per channel, filled
/// from every `AdcSample` decoded while the most recently seen
/// `HitIndex` selects which channel it belongs to.
pub struct PedestalSink<const BINS: usize> {
  grid: ChannelGrid<BINS>,
  current: Option<CardChipChan>,
}

impl<const BINS: usize> PedestalSink<BINS> {
  pub const fn new(min_bin: i32, max_bin: i32, bin_width: i32) -> Self {
    PedestalSink {
      grid: ChannelGrid::new(min_bin, max_bin, bin_width),
      current: None,
    }
  }

  /// Feed one decoded item. Returns `true` if it deposited a sample
  /// (used by test S6 to verify exactly one entry per `AdcSample`).
  pub fn feed(&mut self, item: &FrameItem) -> bool {
    match item {
      FrameItem::HitIndex(ccc) => {
        self.current = Some(*ccc);
        false
      }
      FrameItem::AdcSample(value) => {
        let Some(ccc) = self.current else { return false };
        self.grid.get_mut(ccc.chip as usize, ccc.chan as usize).add(*value as i32);
        true
      }
      _ => false,
    }
  }

  pub fn stats(&self, asic: usize, chan: usize) -> Stats {
    self.grid.get(asic, chan).stats()
  }

  pub fn histogram(&self, asic: usize, chan: usize) -> &Histogram<BINS> {
    self.grid.get(asic, chan)
  }

  pub fn clear(&mut self) {
    self.grid.clear_all();
    self.current = None;
  }

  /// Re-center this channel's histogram on its current mean (`hped
  /// centermean`).
  pub fn center_on_mean(&mut self, asic: usize, chan: usize) {
    let mean = self.grid.get(asic, chan).stats().mean as i32;
    self.grid.get_mut(asic, chan).set_origin(mean - self.grid.get(asic, chan).bin_width() * 8);
  }

  /// Shift this channel's histogram origin to an explicit value (`hped
  /// offset`), without touching its bin contents.
  pub fn set_origin(&mut self, asic: usize, chan: usize, min_bin: i32) {
    self.grid.get_mut(asic, chan).set_origin(min_bin);
  }
}

/// Hit-rate histogram (§6.2 `hhit`): counts `HitCount`/`HitHisto`
/// occurrences per channel.
pub struct HitRateSink<const BINS: usize> {
  grid: ChannelGrid<BINS>,
}

impl<const BINS: usize> HitRateSink<BINS> {
  pub const fn new(max_count: i32, bin_width: i32) -> Self {
    HitRateSink {
      grid: ChannelGrid::new(0, max_count, bin_width),
    }
  }

  pub fn feed(&mut self, item: &FrameItem) -> bool {
    match item {
      FrameItem::HitCount(ccc) | FrameItem::HitHisto(ccc) => {
        self.grid.get_mut(ccc.chip as usize, ccc.chan as usize).add(1);
        true
      }
      _ => false,
    }
  }

  pub fn stats(&self, asic: usize, chan: usize) -> Stats {
    self.grid.get(asic, chan).stats()
  }

  pub fn clear(&mut self) {
    self.grid.clear_all();
  }
}

/// S-curve histogram (§4.6, §6.2 `shisto`): per-channel threshold-scan
/// bins (`s_bins[0..16]`), fed by `LatHistoBin`.
pub struct ScurveSink {
  grid: ChannelGrid<16>,
}

impl ScurveSink {
  pub const fn new() -> Self {
    ScurveSink {
      grid: ChannelGrid::new(0, 16, 1),
    }
  }

  /// `s_bins[0..16]` for one channel, most-significant threshold last.
  pub fn s_bins(&self, asic: usize, chan: usize) -> [u32; 16] {
    *self.grid.get(asic, chan).bins()
  }

  pub fn set_bin(&mut self, asic: usize, chan: usize, threshold: usize, count: u32) {
    let slot = &mut self.grid.get_mut(asic, chan).bins_mut()[threshold];
    *slot = count;
  }

  pub fn feed(&mut self, chip: u8, chan: u8, threshold: u16, item: &FrameItem) -> bool {
    if let FrameItem::LatHistoBin { bin, content } = item {
      let _ = bin;
      self.set_bin(chip as usize, chan as usize, threshold as usize, *content);
      true
    } else {
      false
    }
  }

  pub fn clear(&mut self) {
    self.grid.clear_all();
  }
}

impl Default for ScurveSink {
  fn default() -> Self {
    Self::new()
  }
}

/// Busy histogram (§6.2 `hbusy`): a single card-wide accumulator, not
/// addressed per channel.
pub struct BusySink<const BINS: usize> {
  histogram: Histogram<BINS>,
}

impl<const BINS: usize> BusySink<BINS> {
  pub const fn new(min_bin: i32, max_bin: i32, bin_width: i32) -> Self {
    BusySink {
      histogram: Histogram::new(min_bin, max_bin, bin_width),
    }
  }

  pub fn add(&mut self, busy_cycles: i32) {
    self.histogram.add(busy_cycles);
  }

  pub fn stats(&self) -> Stats {
    self.histogram.stats()
  }

  pub fn clear(&mut self) {
    self.histogram.clear();
  }
}

/// Event-period histogram: the interval between successive
/// `StartOfEvent` timestamps, in clock ticks.
pub struct EventPeriodSink<const BINS: usize> {
  histogram: Histogram<BINS>,
  last_timestamp: Option<u64>,
}

impl<const BINS: usize> EventPeriodSink<BINS> {
  pub const fn new(min_bin: i32, max_bin: i32, bin_width: i32) -> Self {
    EventPeriodSink {
      histogram: Histogram::new(min_bin, max_bin, bin_width),
      last_timestamp: None,
    }
  }

  pub fn feed(&mut self, item: &FrameItem) {
    if let FrameItem::StartOfEvent { timestamp, .. } = item {
      if let Some(last) = self.last_timestamp {
        self.histogram.add(timestamp.saturating_sub(last) as i32);
      }
      self.last_timestamp = Some(*timestamp);
    }
  }

  pub fn stats(&self) -> Stats {
    self.histogram.stats()
  }

  pub fn clear(&mut self) {
    self.histogram.clear();
    self.last_timestamp = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pedestal_sink_adds_exactly_one_entry_per_adc_sample() {
    let mut sink = PedestalSink::<64>::new(0, 4096, 64);
    let ccc = CardChipChan { card: 0, chip: 1, chan: 5 };
    assert!(!sink.feed(&FrameItem::HitIndex(ccc)));
    assert!(sink.feed(&FrameItem::AdcSample(100)));
    assert!(sink.feed(&FrameItem::AdcSample(200)));
    assert_eq!(sink.stats(1, 5).entries, 2);
    assert_eq!(sink.stats(1, 6).entries, 0);
  }

  #[test]
  fn adc_sample_before_any_hit_index_is_dropped() {
    let mut sink = PedestalSink::<64>::new(0, 4096, 64);
    assert!(!sink.feed(&FrameItem::AdcSample(100)));
  }

  #[test]
  fn hit_rate_sink_counts_both_hit_variants() {
    let mut sink = HitRateSink::<16>::new(16, 1);
    let ccc = CardChipChan { card: 0, chip: 0, chan: 0 };
    sink.feed(&FrameItem::HitCount(ccc));
    sink.feed(&FrameItem::HitHisto(ccc));
    assert_eq!(sink.stats(0, 0).entries, 2);
  }

  #[test]
  fn event_period_sink_needs_two_events_to_produce_an_entry() {
    let mut sink = EventPeriodSink::<32>::new(0, 1000, 10);
    sink.feed(&FrameItem::StartOfEvent { timestamp: 100, event_count: 0 });
    assert_eq!(sink.stats().entries, 0);
    sink.feed(&FrameItem::StartOfEvent { timestamp: 150, event_count: 1 });
    assert_eq!(sink.stats().entries, 1);
  }
}
