// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! The slice of the scheduler the synchronization core depends on.
//!
//! Blocking primitives never touch thread control blocks. They deal in
//! [`TaskId`] handles and ask the scheduler, through [`TaskIf`], to park the
//! current task or to make a parked one runnable again. Which runnable task
//! runs next is entirely the scheduler's business.
//!
//! # Cargo Features
//!
//! - `test`: a host uniprocessor simulation that implements [`TaskIf`] and
//!   the platform hooks of `kernel_guard` and `kplat` on top of std threads.
//!   See [`host`].

#![cfg_attr(not(any(test, feature = "test")), no_std)]

#[macro_use]
extern crate log;

use core::fmt;

#[cfg(feature = "test")]
pub mod host;

#[cfg(feature = "test")]
pub use self::host::{JoinHandle, init_scheduler, spawn, yield_now};

/// Opaque identity of a kernel task.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw task id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw task id.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Thread lifecycle operations provided by the scheduler.
#[crate_interface::def_interface]
pub trait TaskIf {
    /// The task running on this CPU.
    fn current() -> TaskId;

    /// Mark the current task not runnable and switch away.
    ///
    /// Must be called with local IRQs disabled. Returns, still with IRQs
    /// disabled, after some other context passed the task to
    /// [`unblock`](TaskIf::unblock).
    fn block_current();

    /// Make a blocked task runnable again. Never blocks; callable from an
    /// interrupt handler. Must be called with local IRQs disabled.
    fn unblock(task: TaskId);

    /// The scheduling priority of `task`, if the scheduler has priorities.
    /// Larger is more urgent.
    fn priority(task: TaskId) -> Option<i32>;

    /// Per-tick accounting (time slice expiry and the like). Called from the
    /// timer interrupt handler.
    fn timer_tick();
}

/// The task running on this CPU.
#[inline]
pub fn current() -> TaskId {
    crate_interface::call_interface!(crate::TaskIf::current)
}

/// Block the current task until [`unblock`]ed. IRQs must be disabled.
#[inline]
pub fn block_current() {
    trace!("{} blocks", current());
    crate_interface::call_interface!(crate::TaskIf::block_current)
}

/// Make `task` runnable. IRQs must be disabled.
#[inline]
pub fn unblock(task: TaskId) {
    trace!("{task} unblocked");
    crate_interface::call_interface!(crate::TaskIf::unblock(task))
}

/// The scheduling priority of `task`, if any.
#[inline]
pub fn priority(task: TaskId) -> Option<i32> {
    crate_interface::call_interface!(crate::TaskIf::priority(task))
}

/// Scheduler bookkeeping for one timer tick.
#[inline]
pub fn timer_tick() {
    crate_interface::call_interface!(crate::TaskIf::timer_tick)
}
