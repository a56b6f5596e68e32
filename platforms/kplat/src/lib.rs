//! Hardware platform abstraction layer.
//!
//! The tick clock and the synchronization core only need three things from
//! the machine underneath them: byte-wide port I/O to program the interval
//! timer, a way to attach a handler to an interrupt vector, and a way to ask
//! whether the CPU is currently servicing an interrupt. Each is a
//! [`crate_interface`] trait the platform implements once.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod interrupts;
pub mod io;
pub mod timer;
