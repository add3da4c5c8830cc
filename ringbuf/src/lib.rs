#![cfg_attr(not(test), no_std)]

//! The AXI ring-buffer pump (§3.3, §3.4, §4.1): a lock-free hardware/
//! software queue of event-fragment buffers, recycled as soon as the
//! network layer confirms transmission.

mod control;
mod descriptor;
mod hw;
mod pool;
mod pump;
mod sim;

pub use control::{TimeoutValue, RESET, RETPND, RUN, TIMED, TIMEVAL};
pub use descriptor::{BufferId, BUFFER_COUNT, BUFFER_STRIDE_BYTES};
pub use hw::RingHw;
pub use pool::{Block, BlockPool, BLOCK_CAPACITY_BYTES};
pub use pump::{RingError, RingPump, MAX_BUFFER_CAPACITY_BYTES, SW_PREFIX_OFFSET};
pub use sim::SimRingHw;
