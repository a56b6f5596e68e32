//! Byte-wide port I/O.

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "none", target_arch = "x86_64"))] {
        /// Write `value` to I/O `port`.
        #[inline]
        pub fn outb(port: u16, value: u8) {
            unsafe {
                core::arch::asm!(
                    "out dx, al",
                    in("dx") port,
                    in("al") value,
                    options(nomem, nostack, preserves_flags)
                );
            }
        }

        /// Read a byte from I/O `port`.
        #[inline]
        pub fn inb(port: u16) -> u8 {
            let value: u8;
            unsafe {
                core::arch::asm!(
                    "in al, dx",
                    in("dx") port,
                    out("al") value,
                    options(nomem, nostack, preserves_flags)
                );
            }
            value
        }
    } else {
        /// Port I/O for platforms without `in`/`out` instructions, or for a
        /// simulated machine.
        #[crate_interface::def_interface]
        pub trait PortIoIf {
            /// Write `value` to I/O `port`.
            fn outb(port: u16, value: u8);

            /// Read a byte from I/O `port`.
            fn inb(port: u16) -> u8;
        }

        /// Write `value` to I/O `port`.
        #[inline]
        pub fn outb(port: u16, value: u8) {
            crate_interface::call_interface!(crate::io::PortIoIf::outb(port, value))
        }

        /// Read a byte from I/O `port`.
        #[inline]
        pub fn inb(port: u16) -> u8 {
            crate_interface::call_interface!(crate::io::PortIoIf::inb(port))
        }
    }
}
