//! Host-side companion tooling (§1 "companion host-side tooling", §6.2):
//! a UDP command client, a DAQ credit issuer, and the frame decoder every
//! reply is read back through. A plain `std` binary: nothing here is
//! `no_std`.

pub mod client;
pub mod config;
pub mod daq;
pub mod error;

pub use client::Client;
pub use config::{FileConfig, Settings};
pub use error::Error;
