#![cfg_attr(not(test), no_std)]

//! Histogram accumulators fed by the decoded frame stream (§3.8, §2):
//! pedestal, hit-rate, S-curve, busy and event-period sinks, plus the
//! `hitprob` threshold-scan (§4.6).

mod histogram;
mod hitprob;
mod sinks;

pub use histogram::{Histogram, Stats};
pub use hitprob::{hitprob, HitProbResult};
pub use sinks::{BusySink, ChannelGrid, EventPeriodSink, HitRateSink, PedestalSink, ScurveSink};
