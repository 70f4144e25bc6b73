#![cfg_attr(not(test), no_std)]

// must stay first so the log macros are visible to every module below
#[macro_use]
pub(crate) mod fmt;

pub mod bus;
pub mod drivers;
pub mod math;
