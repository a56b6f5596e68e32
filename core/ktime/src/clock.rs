//! Tick counter and the 8254 timer interrupt.

use core::sync::atomic::{Ordering, compiler_fence};

use kbuild_config::{
    PIT_CH0_PORT, PIT_CMD_PORT, PIT_DIVISOR, PIT_MODE_RATE_GENERATOR, TIMER_FREQ,
    TIMER_IRQ_VECTOR,
};
use kernel_guard::IrqCell;

/// Timer interrupts since boot.
static TICKS: IrqCell<i64> = IrqCell::new(0);

/// Programs PIT channel 0 to interrupt [`TIMER_FREQ`] times per second and
/// installs [`timer_interrupt`].
///
/// # Panics
///
/// Panics if the timer vector cannot be registered.
pub fn init() {
    kplat::io::outb(PIT_CMD_PORT, PIT_MODE_RATE_GENERATOR);
    kplat::io::outb(PIT_CH0_PORT, (PIT_DIVISOR & 0xff) as u8);
    kplat::io::outb(PIT_CH0_PORT, (PIT_DIVISOR >> 8) as u8);
    debug!("8254 timer: {TIMER_FREQ} Hz, divisor {PIT_DIVISOR}");

    if !kplat::interrupts::register(TIMER_IRQ_VECTOR, timer_interrupt) {
        panic!("cannot register the 8254 timer on vector {TIMER_IRQ_VECTOR:#x}");
    }
    debug!("8254 timer handler on vector {TIMER_IRQ_VECTOR:#x}");
}

/// Timer ticks since the OS booted.
pub fn now() -> i64 {
    let ticks = *TICKS.lock();
    compiler_fence(Ordering::SeqCst);
    ticks
}

/// Ticks elapsed since `since`, a value once returned by [`now`].
pub fn elapsed(since: i64) -> i64 {
    now() - since
}

/// The timer interrupt handler.
///
/// Advances the clock, wakes the sleepers that are due and lets the
/// scheduler account for the tick.
pub fn timer_interrupt() {
    let now = {
        let mut ticks = TICKS.lock();
        *ticks += 1;
        *ticks
    };
    crate::sleep::wake_sleepers(now);
    ktask::timer_tick();
}

/// Logs timer statistics.
pub fn print_stats() {
    info!("Timer: {} ticks", now());
}
