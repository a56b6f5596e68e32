//! A sleeping lock with holder tracking.

use core::fmt;

use kernel_guard::{IrqCell, IrqSave};
use ktask::TaskId;

use crate::Semaphore;

/// A lock that can be held by at most one task at a time.
///
/// This is a binary [`Semaphore`] plus the identity of the task holding it.
/// Unlike a semaphore, a lock must be released by the task that acquired it,
/// and acquiring a lock the current task already holds is an error.
///
/// `Lock` implements [`lock_api::RawMutex`], see [`Mutex`].
pub struct Lock {
    holder: IrqCell<Option<TaskId>>,
    sema: Semaphore,
}

impl Lock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        Self {
            holder: IrqCell::new(None),
            sema: Semaphore::new(1),
        }
    }

    /// Acquires the lock, sleeping until it becomes available.
    ///
    /// # Panics
    ///
    /// Panics if called from an interrupt handler, or if the current task
    /// already holds the lock.
    pub fn acquire(&self) {
        self.check_acquire();
        let _irq = IrqSave::new();
        self.sema.down();
        *self.holder.lock() = Some(ktask::current());
    }

    /// Acquires the lock if it is free. Never sleeps.
    ///
    /// # Panics
    ///
    /// Same as [`acquire`](Self::acquire).
    pub fn try_acquire(&self) -> bool {
        self.check_acquire();
        let _irq = IrqSave::new();
        let acquired = self.sema.try_down();
        if acquired {
            *self.holder.lock() = Some(ktask::current());
        }
        acquired
    }

    /// Releases the lock.
    ///
    /// # Panics
    ///
    /// Panics if the current task does not hold the lock.
    pub fn release(&self) {
        let me = ktask::current();
        let _irq = IrqSave::new();
        let mut holder = self.holder.lock();
        assert_eq!(
            *holder,
            Some(me),
            "{me} tried to release a lock it doesn't hold"
        );
        *holder = None;
        drop(holder);
        self.sema.up();
    }

    /// Whether the current task holds the lock.
    pub fn held_by_current_thread(&self) -> bool {
        self.holder() == Some(ktask::current())
    }

    /// The task holding the lock, if any.
    pub fn holder(&self) -> Option<TaskId> {
        *self.holder.lock()
    }

    /// Whether some task holds the lock.
    pub fn is_locked(&self) -> bool {
        self.holder().is_some()
    }

    fn check_acquire(&self) {
        assert!(
            !kplat::interrupts::in_interrupt(),
            "Lock::acquire called from interrupt context"
        );
        assert!(
            !self.held_by_current_thread(),
            "{} tried to acquire a lock it already holds",
            ktask::current()
        );
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("holder", &self.holder())
            .field("waiters", &self.sema.waiter_count())
            .finish()
    }
}

unsafe impl lock_api::RawMutex for Lock {
    /// Only the acquiring task may release, so guards stay put.
    type GuardMarker = lock_api::GuardNoSend;

    /// Initial value for an unlocked mutex.
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Lock::new();

    #[inline(always)]
    fn lock(&self) {
        self.acquire()
    }

    #[inline(always)]
    fn try_lock(&self) -> bool {
        self.try_acquire()
    }

    #[inline(always)]
    unsafe fn unlock(&self) {
        self.release()
    }

    #[inline(always)]
    fn is_locked(&self) -> bool {
        Lock::is_locked(self)
    }
}

/// An alias of [`lock_api::Mutex`].
pub type Mutex<T> = lock_api::Mutex<Lock, T>;
/// An alias of [`lock_api::MutexGuard`].
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, Lock, T>;

