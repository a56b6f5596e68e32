use std::{
    sync::{Mutex, MutexGuard, Once, PoisonError},
    time::Duration,
};

use kbuild_config::{PIT_CH0_PORT, PIT_CMD_PORT, PIT_DIVISOR, TIMER_FREQ, TIMER_IRQ_VECTOR};
use kernel_guard::IrqSave;
use ktask::{self as thread, host};

static INIT: Once = Once::new();
// The clock and the sleep queue are global.
static SERIAL: Mutex<()> = Mutex::new(());

fn setup() -> MutexGuard<'static, ()> {
    INIT.call_once(|| {
        thread::init_scheduler();
        ktime::init();
    });
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn tick() {
    host::raise_irq(TIMER_IRQ_VECTOR);
}

fn ticks(n: i64) {
    for _ in 0..n {
        tick();
    }
}

#[test]
fn init_programs_pit() {
    let _serial = setup();

    let expected = [
        (PIT_CMD_PORT, 0x34),
        (PIT_CH0_PORT, (PIT_DIVISOR & 0xff) as u8),
        (PIT_CH0_PORT, (PIT_DIVISOR >> 8) as u8),
    ];
    let writes = host::port_writes();
    assert!(writes.windows(3).any(|w| w == &expected[..]), "{writes:x?}");

    if TIMER_FREQ == 100 {
        assert_eq!(PIT_DIVISOR, 11932);
    }
}

#[test]
fn one_tick_per_interrupt() {
    let _serial = setup();

    let t0 = ktime::now();
    let sched_ticks = host::timer_ticks();
    ticks(3);
    assert_eq!(ktime::elapsed(t0), 3);
    assert_eq!(ktime::now(), t0 + 3);
    assert_eq!(host::timer_ticks(), sched_ticks + 3);
    ktime::print_stats();
}

#[test]
fn sleep_never_wakes_early() {
    let _serial = setup();

    let sleeper = thread::spawn(|| {
        let start = ktime::now();
        ktime::sleep(10);
        (start, ktime::now())
    });
    let id = sleeper.id();
    host::wait_blocked(id);

    for _ in 0..9 {
        tick();
        assert!(host::is_blocked(id));
    }
    tick();
    assert!(!host::is_blocked(id));

    let (start, woke) = sleeper.join();
    assert!(woke >= start + 10);
}

#[test]
fn same_tick_sleepers_wake_together() {
    let _serial = setup();

    let sleepers: Vec<_> = (0..3)
        .map(|_| {
            let h = thread::spawn(|| ktime::sleep(4));
            host::wait_blocked(h.id());
            h
        })
        .collect();

    ticks(3);
    assert!(sleepers.iter().all(|h| host::is_blocked(h.id())));
    tick();
    assert!(sleepers.iter().all(|h| !host::is_blocked(h.id())));

    for h in sleepers {
        h.join();
    }
}

#[test]
fn sleepers_wake_in_deadline_order() {
    let _serial = setup();

    let late = thread::spawn(|| ktime::sleep(5));
    host::wait_blocked(late.id());
    let early = thread::spawn(|| ktime::sleep(2));
    host::wait_blocked(early.id());

    ticks(2);
    assert!(!host::is_blocked(early.id()));
    assert!(host::is_blocked(late.id()));
    early.join();

    ticks(3);
    assert!(!host::is_blocked(late.id()));
    late.join();
}

#[test]
fn nonpositive_sleep_returns_immediately() {
    let _serial = setup();

    let t0 = ktime::now();
    ktime::sleep(0);
    ktime::sleep(-3);
    assert_eq!(ktime::now(), t0);
}

#[test]
fn msleep_rounds_down_to_ticks() {
    let _serial = setup();

    let expected = 100 * TIMER_FREQ / 1000;
    assert!(expected > 0);

    let sleeper = thread::spawn(|| ktime::msleep(100));
    let id = sleeper.id();
    host::wait_blocked(id);
    ticks(expected - 1);
    assert!(host::is_blocked(id));
    tick();
    assert!(!host::is_blocked(id));
    sleeper.join();
}

#[test]
fn sub_tick_delays_do_not_block() {
    let _serial = setup();

    let t0 = ktime::now();
    ktime::usleep(10);
    ktime::nsleep(500);
    ktime::msleep(0);
    ktime::usleep(-1);
    assert_eq!(ktime::now(), t0);
}

#[test]
fn calibrate_against_running_clock() {
    let _serial = setup();

    let clock = host::start_periodic(TIMER_IRQ_VECTOR, Duration::from_millis(2));
    ktime::calibrate();
    drop(clock);

    let loops = ktime::loops_per_tick();
    assert!(loops >= 1 << 10);

    // a sub-tick delay now spins for a while but still never blocks
    let t0 = ktime::now();
    ktime::nsleep(1_000);
    assert!(ktime::elapsed(t0) <= 1);
}

#[test]
#[should_panic(expected = "interrupts disabled")]
fn sleep_with_irqs_masked_panics() {
    let _serial = setup();

    let _irq = IrqSave::new();
    ktime::sleep(1);
}

#[test]
#[should_panic(expected = "interrupt context")]
fn sleep_in_interrupt_panics() {
    let _serial = setup();

    const VECTOR: usize = 0x70;
    fn handler() {
        ktime::sleep(1);
    }
    assert!(kplat::interrupts::register(VECTOR, handler));
    host::raise_irq(VECTOR);
}

#[test]
fn longest_sleeps_do_not_wrap() {
    let _serial = setup();

    // None of these can ever be due; they stay parked for the rest of the run.
    tick();
    let forever = thread::spawn(|| ktime::sleep(i64::MAX));
    host::wait_blocked(forever.id());
    let forever_ms = thread::spawn(|| ktime::msleep(i64::MAX));
    host::wait_blocked(forever_ms.id());
    let long_ms = thread::spawn(|| ktime::msleep(i64::MAX / 10));
    host::wait_blocked(long_ms.id());

    ticks(2);
    assert!(host::is_blocked(forever.id()));
    assert!(host::is_blocked(forever_ms.id()));
    assert!(host::is_blocked(long_ms.id()));
}
