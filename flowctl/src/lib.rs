#![cfg_attr(not(test), no_std)]

//! Credit-based, loss-aware flow control for DAQ streaming (§4.4): unit-
//! selectable credits, sequence numbering, loss detection, and three
//! configurable recovery policies.

mod controller;
mod counters;
mod credit;
mod policy;
mod seq;
mod state;

pub use controller::{DaqRequestOutcome, FlowController, PeriodicOutcome};
pub use counters::FlowCounters;
pub use credit::{CreditUnit, PAUSE_AMOUNT};
pub use policy::LossPolicy;
pub use seq::forward_distance;
pub use state::FlowState;
