//! Condition variables.

use alloc::{collections::VecDeque, sync::Arc};
use core::fmt;

use kernel_guard::{IrqCell, IrqSave};

use crate::{Lock, MutexGuard, Semaphore};

/// A Mesa-style condition variable.
///
/// A signal only wakes a waiter; it does not hand over the lock or promise
/// that the condition still holds by the time the waiter runs. Callers
/// re-check their condition in a loop.
///
/// Every wait parks on its own semaphore, so a signal wakes exactly one
/// waiter, oldest first, and a signal with nobody waiting is lost.
pub struct Condvar {
    waiters: IrqCell<VecDeque<Arc<Semaphore>>>,
}

impl Condvar {
    /// Creates a condition variable with no waiters.
    pub const fn new() -> Self {
        Self {
            waiters: IrqCell::new(VecDeque::new()),
        }
    }

    /// Atomically releases `lock` and waits to be signaled, then re-acquires
    /// `lock` before returning.
    ///
    /// # Panics
    ///
    /// Panics if called from an interrupt handler, or if the current task
    /// does not hold `lock`.
    pub fn wait(&self, lock: &Lock) {
        assert!(
            !kplat::interrupts::in_interrupt(),
            "Condvar::wait called from interrupt context"
        );
        assert!(
            lock.held_by_current_thread(),
            "{} waited on a condition without holding its lock",
            ktask::current()
        );

        let waiter = Arc::new(Semaphore::new(0));
        {
            let _irq = IrqSave::new();
            self.waiters.lock().push_back(waiter.clone());
            lock.release();
        }
        waiter.down();
        lock.acquire();
    }

    /// Wakes the longest-waiting task, if any.
    ///
    /// # Panics
    ///
    /// Panics if the current task does not hold `lock`.
    pub fn signal(&self, lock: &Lock) {
        assert!(
            lock.held_by_current_thread(),
            "{} signaled a condition without holding its lock",
            ktask::current()
        );
        let waiter = self.waiters.lock().pop_front();
        if let Some(waiter) = waiter {
            waiter.up();
        }
    }

    /// Wakes every waiting task.
    ///
    /// # Panics
    ///
    /// Panics if the current task does not hold `lock`.
    pub fn broadcast(&self, lock: &Lock) {
        assert!(
            lock.held_by_current_thread(),
            "{} broadcast a condition without holding its lock",
            ktask::current()
        );
        while self.waiter_count() > 0 {
            self.signal(lock);
        }
    }

    /// [`wait`](Self::wait) on the lock behind a [`MutexGuard`].
    pub fn wait_guard<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        // SAFETY: the lock is handed back to the guard's owner before this
        // returns, so the guard stays valid.
        let lock = unsafe { MutexGuard::mutex(guard).raw() };
        self.wait(lock);
    }

    /// [`signal`](Self::signal) with the lock behind a [`MutexGuard`].
    pub fn signal_guard<T: ?Sized>(&self, guard: &MutexGuard<'_, T>) {
        // SAFETY: only used to check ownership.
        self.signal(unsafe { MutexGuard::mutex(guard).raw() });
    }

    /// [`broadcast`](Self::broadcast) with the lock behind a [`MutexGuard`].
    pub fn broadcast_guard<T: ?Sized>(&self, guard: &MutexGuard<'_, T>) {
        // SAFETY: only used to check ownership.
        self.broadcast(unsafe { MutexGuard::mutex(guard).raw() });
    }

    /// Number of tasks waiting to be signaled.
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("waiters", &self.waiter_count())
            .finish()
    }
}
