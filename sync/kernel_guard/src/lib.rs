// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! RAII wrappers that run a critical section with local IRQs disabled.
//!
//! On a single CPU the only concurrent actor is the interrupt handler, so
//! masking local interrupts is the whole of the mutual exclusion story:
//!
//! - [`IrqSave`]: saves the IRQ state, disables IRQs, restores on drop.
//! - [`NoOp`]: does nothing (for code already running with IRQs off).
//! - [`IrqCell`]: data that can only be reached while IRQs are masked.
//!
//! Guards nest. Only the outermost guard re-enables interrupts, and only if
//! they were enabled when it was created.
//!
//! # Platform hooks
//!
//! On `x86_64` bare metal the guards execute `pushfq`/`cli` directly. Every
//! other target must provide an implementation of [`KernelGuardIf`]:
//!
//! ```rust,ignore
//! struct IrqImpl;
//!
//! #[crate_interface::impl_interface]
//! impl kernel_guard::KernelGuardIf for IrqImpl {
//!     fn local_irq_save_and_disable() -> usize { /* ... */ 0 }
//!     fn local_irq_restore(flags: usize) { /* ... */ }
//!     fn local_irq_enabled() -> bool { true }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod arch;
mod cell;
mod guard;

pub use cell::{IrqCell, IrqCellGuard, MaskedCell, MaskedCellGuard};
pub use guard::{BaseGuard, IrqSave, NoOp};

/// Low-level local interrupt control, supplied by the platform.
#[crate_interface::def_interface]
pub trait KernelGuardIf {
    /// Save and disable local interrupts, returning saved flags.
    ///
    /// A non-zero return value means interrupts were enabled before.
    fn local_irq_save_and_disable() -> usize;

    /// Restore local interrupts from saved flags.
    fn local_irq_restore(flags: usize);

    /// Whether local interrupts are currently enabled.
    fn local_irq_enabled() -> bool;
}

/// Returns `true` if local interrupts are currently enabled.
#[inline]
pub fn irqs_enabled() -> bool {
    arch::local_irq_enabled()
}
