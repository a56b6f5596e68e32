//! Guard types.

use core::marker::PhantomData;

/// Base trait for all guard types.
///
/// Guards implement RAII pattern to automatically manage critical sections.
pub trait BaseGuard {
    /// State saved when entering critical section.
    type State: Clone + Copy;

    /// Enter critical section, returning saved state.
    fn acquire() -> Self::State;

    /// Exit critical section, restoring state.
    fn release(state: Self::State);
}

/// No-op guard (does nothing).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl BaseGuard for NoOp {
    type State = ();

    #[inline(always)]
    fn acquire() -> Self::State {}

    #[inline(always)]
    fn release(_state: Self::State) {}
}

impl NoOp {
    /// Create a new no-op guard.
    #[inline(always)]
    pub const fn new() -> Self {
        Self
    }
}

/// Guard that saves the local IRQ state, disables IRQs, and restores the
/// saved state when dropped.
///
/// The guard is tied to the task that created it and cannot be sent to
/// another one.
#[derive(Debug)]
pub struct IrqSave {
    flags: usize,
    _not_send: PhantomData<*mut ()>,
}

impl BaseGuard for IrqSave {
    type State = usize;

    #[inline]
    fn acquire() -> Self::State {
        let flags = crate::arch::local_irq_save_and_disable();
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        flags
    }

    #[inline]
    fn release(state: Self::State) {
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        crate::arch::local_irq_restore(state)
    }
}

impl IrqSave {
    /// Create a new guard, entering the critical section.
    #[inline]
    pub fn new() -> Self {
        Self {
            flags: <Self as BaseGuard>::acquire(),
            _not_send: PhantomData,
        }
    }

    /// Whether interrupts were enabled when this guard was created.
    #[inline]
    pub fn was_enabled(&self) -> bool {
        self.flags != 0
    }
}

impl Drop for IrqSave {
    #[inline]
    fn drop(&mut self) {
        <Self as BaseGuard>::release(self.flags)
    }
}

impl Default for IrqSave {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
