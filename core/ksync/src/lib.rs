// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Blocking synchronization primitives for a single CPU.
//!
//! There are no spinlocks here. Every piece of shared state lives in an
//! [`IrqCell`](kernel_guard::IrqCell), so masking local interrupts is all the
//! exclusion needed, and a task that must wait is parked through
//! [`ktask::block_current`] until another context hands it what it waited
//! for.
//!
//! - [`Semaphore`]: counting semaphore; `up` passes its permit straight to a
//!   waiter when there is one.
//! - [`Lock`]: a binary semaphore that remembers its holder.
//! - [`Mutex`]: [`lock_api::Mutex`] on top of [`Lock`].
//! - [`Condvar`]: Mesa-style condition variable bound to a [`Lock`].
//!
//! # Examples
//!
//! ## Semaphore
//! ```no_run
//! use ksync::Semaphore;
//!
//! static SLOTS: Semaphore = Semaphore::new(3);
//!
//! fn task() {
//!     let _permit = SLOTS.down_guard();
//!     // at most three tasks get here at once
//! }
//! ```
//!
//! ## Mutex and Condvar
//! ```no_run
//! use ksync::{Condvar, Mutex};
//!
//! static READY: Mutex<bool> = Mutex::new(false);
//! static CHANGED: Condvar = Condvar::new();
//!
//! fn consumer() {
//!     let mut ready = READY.lock();
//!     while !*ready {
//!         CHANGED.wait_guard(&mut ready);
//!     }
//! }
//!
//! fn producer() {
//!     let mut ready = READY.lock();
//!     *ready = true;
//!     CHANGED.signal_guard(&ready);
//! }
//! ```
//!
//! # Contexts
//!
//! Anything that may block (`down`, `acquire`, `wait`) must not be called
//! from an interrupt handler. `up` and `try_down` never block and are fine
//! there.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod condvar;
mod lock;
mod semaphore;

pub use self::{
    condvar::Condvar,
    lock::{Lock, Mutex, MutexGuard},
    semaphore::{Semaphore, SemaphoreGuard},
};
