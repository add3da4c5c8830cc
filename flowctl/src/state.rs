//! The two-state flow-control FSM (§4.4.4), modeled as pure transition
//! functions so the controller can be unit-tested without a clock or a
//! socket.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowState {
  ReadyAcceptCredit,
  CredReturnTimedOut,
}

/// Outcome of a `daq_request` transition: whether the card was in
/// `CredReturnTimedOut` immediately beforehand: `rx_daq_delayed` is
/// incremented exactly on this edge (§4.4.2, §4.4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTransition {
  pub next: FlowState,
  pub left_timeout: bool,
}

/// `× daq_request` applies from either state (§4.4.4).
pub const fn on_daq_request(current: FlowState) -> RequestTransition {
  RequestTransition {
    next: FlowState::ReadyAcceptCredit,
    left_timeout: matches!(current, FlowState::CredReturnTimedOut),
  }
}

/// `× periodic_timeout` applies from either state (§4.4.4): from
/// `ReadyAcceptCredit` it enters the timed-out state; from
/// `CredReturnTimedOut` it stays (the caller re-applies or abandons the
/// policy).
pub const fn on_periodic_timeout(current: FlowState) -> FlowState {
  match current {
    FlowState::ReadyAcceptCredit => FlowState::CredReturnTimedOut,
    FlowState::CredReturnTimedOut => FlowState::CredReturnTimedOut,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn daq_request_always_lands_in_ready_accept_credit() {
    assert_eq!(on_daq_request(FlowState::ReadyAcceptCredit).next, FlowState::ReadyAcceptCredit);
    assert_eq!(on_daq_request(FlowState::CredReturnTimedOut).next, FlowState::ReadyAcceptCredit);
  }

  #[test]
  fn left_timeout_is_only_set_leaving_the_timed_out_state() {
    assert!(!on_daq_request(FlowState::ReadyAcceptCredit).left_timeout);
    assert!(on_daq_request(FlowState::CredReturnTimedOut).left_timeout);
  }

  #[test]
  fn periodic_timeout_from_ready_enters_timed_out_and_then_self_loops() {
    assert_eq!(on_periodic_timeout(FlowState::ReadyAcceptCredit), FlowState::CredReturnTimedOut);
    assert_eq!(on_periodic_timeout(FlowState::CredReturnTimedOut), FlowState::CredReturnTimedOut);
  }
}
