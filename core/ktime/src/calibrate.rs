//! Busy-wait calibration.

use core::sync::atomic::{AtomicU32, Ordering};

use kbuild_config::TIMER_FREQ;

use crate::clock::now;

/// Busy-loop iterations per timer tick. Zero until [`calibrate`] runs.
static LOOPS_PER_TICK: AtomicU32 = AtomicU32::new(0);

/// Busy-loop iterations per timer tick, as measured by [`calibrate`].
pub fn loops_per_tick() -> u32 {
    LOOPS_PER_TICK.load(Ordering::Relaxed)
}

/// Measures [`loops_per_tick`], used to implement delays shorter than a
/// tick.
///
/// Approximates it as the largest power of two that still fits in one tick,
/// then refines the next 8 bits.
///
/// # Panics
///
/// Panics if interrupts are disabled, since the clock would never advance.
pub fn calibrate() {
    assert!(
        kernel_guard::irqs_enabled(),
        "timer calibration needs interrupts enabled"
    );
    info!("Calibrating timer...");

    let mut loops: u32 = 1 << 10;
    while !too_many_loops(loops << 1) {
        loops <<= 1;
        assert!(loops != 0, "loops_per_tick overflowed");
    }

    let high_bit = loops;
    let mut test_bit = high_bit >> 1;
    while test_bit != high_bit >> 10 {
        if !too_many_loops(high_bit | test_bit) {
            loops |= test_bit;
        }
        test_bit >>= 1;
    }

    LOOPS_PER_TICK.store(loops, Ordering::Relaxed);
    info!("{} loops/s", u64::from(loops) * TIMER_FREQ as u64);
}

/// Returns `true` if `loops` iterations take longer than one timer tick.
pub fn too_many_loops(loops: u32) -> bool {
    // Wait for a tick boundary.
    let start = now();
    while now() == start {
        core::hint::spin_loop();
    }

    let start = now();
    busy_wait(i64::from(loops));
    start != now()
}

/// Spins `loops` times.
///
/// Never inlined: code alignment changes the timing, and calibration only
/// holds if every caller runs the same loop.
#[inline(never)]
pub(crate) fn busy_wait(loops: i64) {
    let mut loops = loops;
    while loops > 0 {
        loops = core::hint::black_box(loops) - 1;
    }
}
