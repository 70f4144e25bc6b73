#![cfg_attr(not(test), no_std)]

#[macro_use]
pub(crate) mod fmt;

pub mod arbiter;
pub mod budget;
pub mod config;
pub mod indicators;
pub mod power_state;
pub mod status;

#[cfg(feature = "firmware")]
pub mod pins;
#[cfg(feature = "firmware")]
pub mod tasks;
