// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! The kernel tick clock.
//!
//! The 8254 programmable interval timer interrupts [`TIMER_FREQ`] times a
//! second. Each interrupt advances a tick counter and wakes the tasks whose
//! sleep has run out. On top of that:
//!
//! - [`now`] / [`elapsed`]: ticks since boot.
//! - [`sleep`]: block for at least a number of ticks.
//! - [`msleep`], [`usleep`], [`nsleep`]: the same in real time units; waits
//!   shorter than a tick spin on a calibrated busy loop instead.
//! - [`calibrate`]: measure how many busy-loop iterations fit in a tick.
//!
//! Boot order is [`init`], enable interrupts, then [`calibrate`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;
#[macro_use]
extern crate log;

mod calibrate;
mod clock;
mod sleep;

pub use kbuild_config::TIMER_FREQ;

pub use self::{
    calibrate::{calibrate, loops_per_tick, too_many_loops},
    clock::{elapsed, init, now, print_stats, timer_interrupt},
    sleep::{msleep, nsleep, sleep, usleep},
};
