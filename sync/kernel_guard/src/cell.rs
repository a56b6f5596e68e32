//! Data that is only reachable inside a masked region.
//!
//! A [`MaskedCell`] is what a spinlock degenerates to on a single CPU: there
//! is no lock word to spin on, only the guard that keeps the interrupt
//! handler out. A busy flag catches re-entrant access from the same task
//! (e.g. an interrupt handler touching a cell its victim was holding).

use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::guard::{BaseGuard, IrqSave};

/// A cell whose contents are accessed with the guard `G` held.
pub struct MaskedCell<G: BaseGuard, T: ?Sized> {
    _phantom: PhantomData<G>,
    busy: AtomicBool,
    data: UnsafeCell<T>,
}

/// RAII access to the contents of a [`MaskedCell`].
///
/// The guard state is restored when this is dropped.
pub struct MaskedCellGuard<'a, G: BaseGuard, T: ?Sized + 'a> {
    guard_state: G::State,
    busy: &'a AtomicBool,
    data: *mut T,
    _not_send: PhantomData<*mut ()>,
}

/// A cell that masks local IRQs while its contents are borrowed.
pub type IrqCell<T> = MaskedCell<IrqSave, T>;

/// Guard for [`IrqCell`].
pub type IrqCellGuard<'a, T> = MaskedCellGuard<'a, IrqSave, T>;

// Exclusion comes from the guard, not from the cell.
unsafe impl<G: BaseGuard, T: ?Sized + Send> Sync for MaskedCell<G, T> {}
unsafe impl<G: BaseGuard, T: ?Sized + Send> Send for MaskedCell<G, T> {}

impl<G: BaseGuard, T> MaskedCell<G, T> {
    /// Create a new cell.
    #[inline(always)]
    pub const fn new(data: T) -> Self {
        Self {
            _phantom: PhantomData,
            busy: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Consume the cell and return the inner value.
    #[inline(always)]
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<G: BaseGuard, T: ?Sized> MaskedCell<G, T> {
    /// Enter the masked region and borrow the contents.
    ///
    /// # Panics
    ///
    /// Panics if the contents are already borrowed.
    #[inline]
    #[track_caller]
    pub fn lock(&self) -> MaskedCellGuard<'_, G, T> {
        let guard_state = G::acquire();
        if self.busy.swap(true, Ordering::Acquire) {
            G::release(guard_state);
            panic!("MaskedCell borrowed re-entrantly");
        }
        MaskedCellGuard {
            guard_state,
            busy: &self.busy,
            data: self.data.get(),
            _not_send: PhantomData,
        }
    }

    /// Run `f` on the contents inside the masked region.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    /// Get mutable reference (zero-cost).
    ///
    /// Since this requires a mutable reference to the cell itself,
    /// no masking is needed.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<G: BaseGuard, T: Default> Default for MaskedCell<G, T> {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<G: BaseGuard, T: ?Sized> fmt::Debug for MaskedCell<G, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MaskedCell")
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<G: BaseGuard, T: ?Sized> Deref for MaskedCellGuard<'_, G, T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        unsafe { &*self.data }
    }
}

impl<G: BaseGuard, T: ?Sized> DerefMut for MaskedCellGuard<'_, G, T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.data }
    }
}

impl<G: BaseGuard, T: ?Sized + fmt::Debug> fmt::Debug for MaskedCellGuard<'_, G, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<G: BaseGuard, T: ?Sized> Drop for MaskedCellGuard<'_, G, T> {
    #[inline(always)]
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        G::release(self.guard_state);
    }
}
