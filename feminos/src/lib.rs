#![cfg_attr(not(test), no_std)]

//! Feminos readout card firmware (§4.7, §5, §9): the hardware trait
//! boundary and the `Service` aggregate/service loop built on top of
//! [`cmdi`], [`ringbuf`], [`flowctl`] and [`histo`].

pub mod hw;
pub mod service;

pub use hw::EthernetHw;
pub use service::Service;
