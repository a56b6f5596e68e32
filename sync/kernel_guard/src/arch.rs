//! Local IRQ save/restore.

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "none", target_arch = "x86_64"))] {
        use core::arch::asm;

        /// RFLAGS.IF
        const IF_BIT: usize = 1 << 9;

        #[inline]
        pub(crate) fn local_irq_save_and_disable() -> usize {
            let flags: usize;
            unsafe { asm!("pushfq", "pop {}", "cli", out(reg) flags) };
            flags & IF_BIT
        }

        #[inline]
        pub(crate) fn local_irq_restore(flags: usize) {
            if flags & IF_BIT != 0 {
                unsafe { asm!("sti") };
            }
        }

        #[inline]
        pub(crate) fn local_irq_enabled() -> bool {
            let flags: usize;
            unsafe { asm!("pushfq", "pop {}", out(reg) flags, options(preserves_flags)) };
            flags & IF_BIT != 0
        }
    } else {
        #[inline]
        pub(crate) fn local_irq_save_and_disable() -> usize {
            crate_interface::call_interface!(crate::KernelGuardIf::local_irq_save_and_disable)
        }

        #[inline]
        pub(crate) fn local_irq_restore(flags: usize) {
            crate_interface::call_interface!(crate::KernelGuardIf::local_irq_restore(flags))
        }

        #[inline]
        pub(crate) fn local_irq_enabled() -> bool {
            crate_interface::call_interface!(crate::KernelGuardIf::local_irq_enabled)
        }
    }
}
