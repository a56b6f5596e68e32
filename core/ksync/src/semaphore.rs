//! A counting semaphore.

use alloc::collections::VecDeque;
use core::fmt;

use kernel_guard::{IrqCell, IrqSave};
use ktask::TaskId;

struct Inner {
    value: usize,
    waiters: VecDeque<TaskId>,
}

impl Inner {
    /// The waiter an `up` wakes: the first one with the highest priority,
    /// or the oldest one if the scheduler has no priorities.
    fn take_waiter(&mut self) -> Option<TaskId> {
        let mut best: Option<(usize, i32)> = None;
        for (index, &task) in self.waiters.iter().enumerate() {
            if let Some(priority) = ktask::priority(task) {
                if best.map_or(true, |(_, p)| priority > p) {
                    best = Some((index, priority));
                }
            }
        }
        self.waiters.remove(best.map_or(0, |(index, _)| index))
    }
}

/// A counting semaphore.
///
/// `down` takes a permit, waiting for one if there is none. `up` gives one
/// back; if tasks are waiting, the permit goes directly to one of them and
/// the count stays where it was.
pub struct Semaphore {
    inner: IrqCell<Inner>,
}

impl Semaphore {
    /// Creates a new semaphore with `value` permits.
    pub const fn new(value: usize) -> Self {
        Self {
            inner: IrqCell::new(Inner {
                value,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Takes a permit, blocking until one is available.
    ///
    /// # Panics
    ///
    /// Panics if called from an interrupt handler.
    pub fn down(&self) {
        assert!(
            !kplat::interrupts::in_interrupt(),
            "Semaphore::down called from interrupt context"
        );
        // Stays masked across the block so the hand-off cannot be missed.
        let _irq = IrqSave::new();
        let mut inner = self.inner.lock();
        if inner.value > 0 {
            inner.value -= 1;
            return;
        }
        inner.waiters.push_back(ktask::current());
        drop(inner);
        ktask::block_current();
    }

    /// Takes a permit if one is available. Never blocks.
    ///
    /// Returns `true` if a permit was taken.
    pub fn try_down(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.value > 0 {
            inner.value -= 1;
            true
        } else {
            false
        }
    }

    /// Returns a permit, waking one waiter if there is any. Never blocks.
    pub fn up(&self) {
        let mut inner = self.inner.lock();
        match inner.take_waiter() {
            Some(task) => ktask::unblock(task),
            None => inner.value += 1,
        }
    }

    /// Number of free permits.
    pub fn value(&self) -> usize {
        self.inner.lock().value
    }

    /// Number of tasks blocked in [`down`](Self::down).
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Takes a permit and returns a guard that gives it back on drop.
    pub fn down_guard(&self) -> SemaphoreGuard<'_> {
        self.down();
        SemaphoreGuard { sem: self }
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Semaphore")
            .field("value", &inner.value)
            .field("waiters", &inner.waiters)
            .finish()
    }
}

/// RAII guard for a semaphore permit.
///
/// The permit is returned with [`Semaphore::up`] when the guard is dropped.
pub struct SemaphoreGuard<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.sem.up();
    }
}
