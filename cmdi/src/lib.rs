#![cfg_attr(not(test), no_std)]

//! The command interpreter (§3.6, §4.5, §4.6, §6.2): selector grammar,
//! pedestal/threshold LUT access, the per-card command context, and
//! the verb table that ties them together with [`flowctl`] and
//! [`histo`] into a single scalar-reply dispatch entry point.

mod context;
mod lut;
mod selector;
mod verbs;

pub use context::{ChipMode, CommandContext, Counters, ServeTarget};
pub use lut::{PedThrLut, SimPedThrLut};
pub use selector::Selector;
pub use verbs::{dispatch, AsicState, Reply, Sinks, AFTER_REGS, AGET_REGS, HISTO_BINS};
