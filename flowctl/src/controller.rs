//! The flow controller (§4.4): ties credit accounting, sequence-number
//! loss detection and the two-state FSM together into the single
//! object the service loop drives once per command and once per
//! `periodic_check`.

use crate::credit::{CreditUnit, PAUSE_AMOUNT};
use crate::counters::FlowCounters;
use crate::policy::LossPolicy;
use crate::seq::forward_distance;
use crate::state::{on_daq_request, on_periodic_timeout, FlowState};

/// Consecutive stalled timeout windows before a recovery policy gives
/// up (§4.4.3: "the four most recent `last_credit_rcv` values ...").
/// Modeled here as a run counter reset by any fresh credit grant,
/// rather than literally diffing a four-entry history buffer: see
/// DESIGN.md for the equivalence argument.
const ABANDON_AFTER_STALLS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaqRequestOutcome {
  pub paused: bool,
  /// Set when this request pulled the controller out of
  /// `CredReturnTimedOut` (§4.4.2, §4.4.4).
  pub left_timeout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicOutcome {
  /// Nothing due yet.
  NoAction,
  Ignored,
  ReCredited,
  /// The pump should resend the last data frame instead of reaping a
  /// new buffer.
  Resend,
  /// Policy gave up after four stalled timeout windows with no fresh
  /// credit.
  ReCreditAbandoned,
  ResendAbandoned,
}

/// Flow-control half of the per-card command context (§3.6).
pub struct FlowController {
  state: FlowState,
  unit: CreditUnit,
  snd_allowed: u32,
  last_daq_sent: Option<u64>,
  exp_req_ix: u8,
  nxt_rep_ix: u16,
  first_in_row: bool,
  resend_last: bool,
  loss_policy: LossPolicy,
  cred_wait_time: u64,
  consecutive_stalls: u8,
  pub counters: FlowCounters,
}

impl FlowController {
  pub fn new(unit: CreditUnit, loss_policy: LossPolicy, cred_wait_time: u64) -> Self {
    FlowController {
      state: FlowState::ReadyAcceptCredit,
      unit,
      snd_allowed: 0,
      last_daq_sent: None,
      exp_req_ix: 0,
      nxt_rep_ix: 0,
      first_in_row: true,
      resend_last: false,
      loss_policy,
      cred_wait_time,
      consecutive_stalls: 0,
      counters: FlowCounters::default(),
    }
  }

  pub fn state(&self) -> FlowState {
    self.state
  }

  pub fn snd_allowed(&self) -> u32 {
    self.snd_allowed
  }

  pub fn can_send(&self) -> bool {
    self.snd_allowed > 0
  }

  pub fn resend_pending(&self) -> bool {
    self.resend_last
  }

  pub fn loss_policy(&self) -> LossPolicy {
    self.loss_policy
  }

  /// `losspolicy <code>` (§4.4.3): takes effect on the next stalled
  /// `periodic_check`, does not retroactively change a stall already
  /// in progress.
  pub fn set_loss_policy(&mut self, policy: LossPolicy) {
    self.loss_policy = policy;
  }

  pub fn cred_wait_time(&self) -> u64 {
    self.cred_wait_time
  }

  pub fn set_cred_wait_time(&mut self, ticks: u64) {
    self.cred_wait_time = ticks;
  }

  pub fn unit(&self) -> CreditUnit {
    self.unit
  }

  /// Handle a `daq <amount> <unit> [<seq>]` request (§4.4.1, §4.4.2,
  /// §4.4.4).
  pub fn daq_request(&mut self, amount: u32, unit: CreditUnit, seq: Option<u8>, now: u64) -> DaqRequestOutcome {
    if let Some(req_seq) = seq {
      let lost = forward_distance(self.exp_req_ix, req_seq);
      if lost != 0 {
        self.counters.daq_miss_cnt += lost as u32;
      }
      self.exp_req_ix = req_seq.wrapping_add(1);
    }

    let transition = on_daq_request(self.state);
    self.state = transition.next;
    if transition.left_timeout {
      self.counters.rx_daq_delayed += 1;
    }
    let _ = now;

    self.unit = unit;
    self.consecutive_stalls = 0;

    if amount == PAUSE_AMOUNT {
      self.snd_allowed = 0;
      self.last_daq_sent = None;
      return DaqRequestOutcome {
        paused: true,
        left_timeout: transition.left_timeout,
      };
    }

    self.snd_allowed += amount;
    DaqRequestOutcome {
      paused: false,
      left_timeout: transition.left_timeout,
    }
  }

  /// Record that a data frame of `data_sz` bytes was just transmitted
  /// to the DAQ consumer, deducting credit per the active unit
  /// (§4.4.1).
  pub fn on_data_frame_sent(&mut self, now: u64, data_sz: u32) {
    match self.unit {
      CreditUnit::Bytes => self.snd_allowed = self.snd_allowed.saturating_sub(data_sz),
      CreditUnit::Frames => self.snd_allowed = self.snd_allowed.saturating_sub(1),
    }
    self.last_daq_sent = Some(now);
    self.resend_last = false;
    self.counters.tx_count += 1;
  }

  /// The `nxt_rep_ix` reply-sequence tag for the datagram about to be
  /// sent, ORed with `0x0100` if it is the first reply of a fresh row
  /// (§4.4.2).
  pub fn next_reply_seq(&mut self) -> u16 {
    let tag = self.nxt_rep_ix | if self.first_in_row { 0x0100 } else { 0 };
    self.first_in_row = false;
    self.nxt_rep_ix = self.nxt_rep_ix.wrapping_add(1) & 0x00FF;
    tag
  }

  /// Run the periodic loss-recovery check (§4.4.3). Only unit `'F'`
  /// times out by design: byte-credit streams have no per-frame retry
  /// concept.
  pub fn periodic_check(&mut self, now: u64) -> PeriodicOutcome {
    let Some(last_sent) = self.last_daq_sent else {
      return PeriodicOutcome::NoAction;
    };
    if self.unit != CreditUnit::Frames {
      return PeriodicOutcome::NoAction;
    }
    if now.saturating_sub(last_sent) <= self.cred_wait_time {
      return PeriodicOutcome::NoAction;
    }

    self.state = on_periodic_timeout(self.state);
    self.consecutive_stalls = self.consecutive_stalls.saturating_add(1);

    if self.loss_policy != LossPolicy::Ignore && self.consecutive_stalls >= ABANDON_AFTER_STALLS {
      self.last_daq_sent = None;
      self.first_in_row = true;
      self.consecutive_stalls = 0;
      return match self.loss_policy {
        LossPolicy::ReCredit => PeriodicOutcome::ReCreditAbandoned,
        LossPolicy::ReSend => PeriodicOutcome::ResendAbandoned,
        LossPolicy::Ignore => unreachable!(),
      };
    }

    match self.loss_policy {
      LossPolicy::Ignore => {
        self.last_daq_sent = None;
        self.first_in_row = true;
        PeriodicOutcome::Ignored
      }
      LossPolicy::ReCredit => {
        self.snd_allowed += 1;
        self.last_daq_sent = None;
        self.first_in_row = true;
        PeriodicOutcome::ReCredited
      }
      LossPolicy::ReSend => {
        self.snd_allowed += 1;
        self.resend_last = true;
        PeriodicOutcome::Resend
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn credit_grant_accumulates_and_is_spent_per_byte() {
    let mut fc = FlowController::new(CreditUnit::Bytes, LossPolicy::Ignore, 1000);
    fc.daq_request(500, CreditUnit::Bytes, None, 0);
    assert_eq!(fc.snd_allowed(), 500);
    fc.on_data_frame_sent(1, 120);
    assert_eq!(fc.snd_allowed(), 380);
  }

  #[test]
  fn pause_sentinel_zeroes_credit_and_clears_last_sent() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 1000);
    fc.daq_request(10, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(5, 1);
    let outcome = fc.daq_request(PAUSE_AMOUNT, CreditUnit::Frames, None, 10);
    assert!(outcome.paused);
    assert_eq!(fc.snd_allowed(), 0);
    assert_eq!(fc.periodic_check(10_000), PeriodicOutcome::NoAction);
  }

  #[test]
  fn sequence_gap_is_counted_as_loss_and_expected_advances() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 1000);
    fc.daq_request(1, CreditUnit::Frames, Some(0), 0);
    fc.daq_request(1, CreditUnit::Frames, Some(5), 1);
    assert_eq!(fc.counters.daq_miss_cnt, 4);
  }

  #[test]
  fn leaving_the_timed_out_state_increments_rx_daq_delayed() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 10);
    fc.daq_request(1, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    fc.periodic_check(20);
    assert_eq!(fc.state(), FlowState::CredReturnTimedOut);
    fc.daq_request(1, CreditUnit::Frames, None, 21);
    assert_eq!(fc.counters.rx_daq_delayed, 1);
    assert_eq!(fc.state(), FlowState::ReadyAcceptCredit);
  }

  #[test]
  fn ignore_policy_clears_last_sent_without_granting_more_credit() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 10);
    fc.daq_request(1, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    assert_eq!(fc.periodic_check(20), PeriodicOutcome::Ignored);
    assert_eq!(fc.snd_allowed(), 0);
  }

  #[test]
  fn recredit_policy_grants_one_credit_per_timeout() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::ReCredit, 10);
    fc.daq_request(0, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    assert_eq!(fc.periodic_check(20), PeriodicOutcome::ReCredited);
    assert_eq!(fc.snd_allowed(), 1);
  }

  #[test]
  fn resend_policy_marks_resend_pending_and_does_not_clear_last_sent() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::ReSend, 10);
    fc.daq_request(0, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    assert_eq!(fc.periodic_check(20), PeriodicOutcome::Resend);
    assert!(fc.resend_pending());
  }

  #[test]
  fn recredit_gives_up_after_four_consecutive_stalled_windows() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::ReCredit, 10);
    fc.daq_request(0, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    // Each periodic_check beyond the wait time re-stalls, since we never
    // send another frame (last_daq_sent stays cleared by ReCredit until
    // the next send: emulate repeated stalls directly).
    assert_eq!(fc.periodic_check(20), PeriodicOutcome::ReCredited);
    fc.on_data_frame_sent(20, 1);
    assert_eq!(fc.periodic_check(40), PeriodicOutcome::ReCredited);
    fc.on_data_frame_sent(40, 1);
    assert_eq!(fc.periodic_check(60), PeriodicOutcome::ReCredited);
    fc.on_data_frame_sent(60, 1);
    assert_eq!(fc.periodic_check(80), PeriodicOutcome::ReCreditAbandoned);
  }

  #[test]
  fn a_fresh_daq_request_resets_the_stall_count() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::ReCredit, 10);
    fc.daq_request(0, CreditUnit::Frames, None, 0);
    fc.on_data_frame_sent(0, 1);
    fc.periodic_check(20);
    fc.on_data_frame_sent(20, 1);
    fc.periodic_check(40);
    fc.on_data_frame_sent(40, 1);
    // A real credit grant arrives, resetting the stall run.
    fc.daq_request(5, CreditUnit::Frames, None, 45);
    fc.on_data_frame_sent(45, 1);
    assert_eq!(fc.periodic_check(60), PeriodicOutcome::ReCredited);
  }

  #[test]
  fn reply_sequence_tags_the_first_reply_of_a_row() {
    let mut fc = FlowController::new(CreditUnit::Frames, LossPolicy::Ignore, 10);
    assert_eq!(fc.next_reply_seq(), 0x0100);
    assert_eq!(fc.next_reply_seq(), 0x0001);
    assert_eq!(fc.next_reply_seq(), 0x0002);
  }
}
