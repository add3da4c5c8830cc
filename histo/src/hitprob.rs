//! The `hitprob` threshold-scan algorithm (§4.6): for a channel's
//! S-curve, find the smallest threshold whose hit probability falls
//! below a target `p`.

use crate::sinks::ScurveSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitProbResult {
  Threshold(u8),
  /// No scanned bin fell below `p`: the per-channel underrange
  /// counter the aggregate reply reports (§4.6).
  Underrange,
}

/// Scan `s_bins[0..16]` for `(asic, chan)` and return the smallest
/// threshold whose hit probability, normalized against `s_bins[0]`
/// (the lowest, and therefore highest-probability, threshold), falls
/// below `p`.
pub fn hitprob(sink: &ScurveSink, asic: usize, chan: usize, p: f64) -> HitProbResult {
  let bins = sink.s_bins(asic, chan);
  let total = bins[0];
  if total == 0 {
    return HitProbResult::Underrange;
  }
  for (threshold, &count) in bins.iter().enumerate() {
    let fraction = count as f64 / total as f64;
    if fraction < p {
      return HitProbResult::Threshold(threshold as u8);
    }
  }
  HitProbResult::Underrange
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scan_with(counts: [u32; 16]) -> ScurveSink {
    let mut sink = ScurveSink::new();
    for (threshold, &count) in counts.iter().enumerate() {
      sink.set_bin(0, 0, threshold, count);
    }
    sink
  }

  #[test]
  fn finds_the_first_threshold_below_the_target_probability() {
    let sink = scan_with([100, 100, 90, 40, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(hitprob(&sink, 0, 0, 0.5), HitProbResult::Threshold(3));
  }

  #[test]
  fn reports_underrange_when_every_bin_stays_above_p() {
    let sink = scan_with([100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100]);
    assert_eq!(hitprob(&sink, 0, 0, 0.01), HitProbResult::Underrange);
  }

  #[test]
  fn an_empty_scurve_is_underrange() {
    let sink = ScurveSink::new();
    assert_eq!(hitprob(&sink, 0, 0, 0.5), HitProbResult::Underrange);
  }
}
