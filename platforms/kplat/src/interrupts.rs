//! Interrupt controller hooks.

/// An interrupt handler. Runs with local IRQs disabled and must not block.
pub type IrqHandler = fn();

/// Interrupt dispatch, supplied by the trap layer of the kernel.
#[crate_interface::def_interface]
pub trait IrqIf {
    /// Attach `handler` to `vector`. Returns `false` if the vector cannot be
    /// used.
    fn register(vector: usize, handler: IrqHandler) -> bool;

    /// Whether the current CPU is executing an interrupt handler.
    fn in_interrupt() -> bool;
}

/// Attach `handler` to `vector`.
#[inline]
pub fn register(vector: usize, handler: IrqHandler) -> bool {
    crate_interface::call_interface!(crate::interrupts::IrqIf::register(vector, handler))
}

/// Whether the current CPU is executing an interrupt handler.
#[inline]
pub fn in_interrupt() -> bool {
    crate_interface::call_interface!(crate::interrupts::IrqIf::in_interrupt)
}
