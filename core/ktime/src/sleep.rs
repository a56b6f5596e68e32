//! Sleeping for a number of ticks, and real-time delays built on it.

use alloc::collections::VecDeque;

use kbuild_config::TIMER_FREQ;
use kernel_guard::{IrqCell, IrqSave};
use kplat::timer::{MS_SEC, NS_SEC, US_SEC};
use ktask::TaskId;

use crate::{
    calibrate::{busy_wait, loops_per_tick},
    clock::{elapsed, now},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SleepEntry {
    task: TaskId,
    wake_tick: i64,
}

/// Blocked sleepers, ordered by wake tick.
static SLEEPERS: IrqCell<VecDeque<SleepEntry>> = IrqCell::new(VecDeque::new());

/// Inserts `entry` after every entry due no later than it.
fn enqueue(queue: &mut VecDeque<SleepEntry>, entry: SleepEntry) {
    let pos = queue.partition_point(|e| e.wake_tick <= entry.wake_tick);
    queue.insert(pos, entry);
}

/// Pops every entry due at `now`, front to back.
fn drain_due(queue: &mut VecDeque<SleepEntry>, now: i64, mut wake: impl FnMut(TaskId)) {
    while let Some(front) = queue.front() {
        if front.wake_tick > now {
            break;
        }
        let task = front.task;
        queue.pop_front();
        wake(task);
    }
}

/// Called by the timer interrupt once the clock reads `now`.
pub(crate) fn wake_sleepers(now: i64) {
    drain_due(&mut SLEEPERS.lock(), now, |task| {
        trace!("{task} wakes at tick {now}");
        ktask::unblock(task);
    });
}

/// Blocks the current task for at least `ticks` timer ticks.
///
/// Returns immediately if `ticks` is zero or negative.
///
/// # Panics
///
/// Panics if called from an interrupt handler or with interrupts disabled.
pub fn sleep(ticks: i64) {
    assert!(
        !kplat::interrupts::in_interrupt(),
        "sleep called from interrupt context"
    );
    assert!(
        kernel_guard::irqs_enabled(),
        "sleep called with interrupts disabled"
    );

    let start = now();
    if elapsed(start) >= ticks {
        return;
    }

    let _irq = IrqSave::new();
    let entry = SleepEntry {
        task: ktask::current(),
        wake_tick: start.saturating_add(ticks),
    };
    trace!("{} sleeps until tick {}", entry.task, entry.wake_tick);
    enqueue(&mut SLEEPERS.lock(), entry);
    ktask::block_current();
}

/// Sleeps for about `ms` milliseconds.
pub fn msleep(ms: i64) {
    real_time_sleep(ms, MS_SEC);
}

/// Sleeps for about `us` microseconds.
pub fn usleep(us: i64) {
    real_time_sleep(us, US_SEC);
}

/// Sleeps for about `ns` nanoseconds.
pub fn nsleep(ns: i64) {
    real_time_sleep(ns, NS_SEC);
}

/// `num / denom` seconds in ticks, rounded down and clamped to `i64`.
fn to_ticks(num: i64, denom: i64) -> i64 {
    // (num / denom) s / (1 / TIMER_FREQ) s
    let ticks = i128::from(num) * i128::from(TIMER_FREQ) / i128::from(denom);
    ticks.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Sleeps for about `num / denom` seconds.
fn real_time_sleep(num: i64, denom: i64) {
    let ticks = to_ticks(num, denom);
    assert!(
        kernel_guard::irqs_enabled(),
        "sleep called with interrupts disabled"
    );

    if ticks > 0 {
        // At least one full tick: let other tasks run.
        sleep(ticks);
    } else {
        // Sub-tick: spin. Scaled down by 1000 to stay clear of overflow.
        assert!(denom % 1000 == 0);
        if num > 0 {
            busy_wait(i64::from(loops_per_tick()) * num / 1000 * TIMER_FREQ / (denom / 1000));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use kbuild_config::TIMER_FREQ;
    use ktask::TaskId;

    use super::{SleepEntry, drain_due, enqueue, to_ticks};

    fn entry(task: u64, wake_tick: i64) -> SleepEntry {
        SleepEntry {
            task: TaskId::new(task),
            wake_tick,
        }
    }

    fn tasks(queue: &std::collections::VecDeque<SleepEntry>) -> Vec<u64> {
        queue.iter().map(|e| e.task.as_u64()).collect()
    }

    #[test]
    fn queue_is_ordered_and_fifo_among_ties() {
        let mut queue = Default::default();
        enqueue(&mut queue, entry(1, 15));
        enqueue(&mut queue, entry(2, 7));
        enqueue(&mut queue, entry(3, 15));
        enqueue(&mut queue, entry(4, 9));
        enqueue(&mut queue, entry(5, 7));
        assert_eq!(tasks(&queue), [2, 5, 4, 1, 3]);
    }

    #[test]
    fn drain_stops_at_first_future_entry() {
        let mut queue = Default::default();
        for (task, tick) in [(1, 5), (2, 5), (3, 5), (4, 6), (5, 9)] {
            enqueue(&mut queue, entry(task, tick));
        }

        let mut woken = Vec::new();
        drain_due(&mut queue, 4, |t| woken.push(t.as_u64()));
        assert!(woken.is_empty());

        drain_due(&mut queue, 5, |t| woken.push(t.as_u64()));
        assert_eq!(woken, [1, 2, 3]);
        assert_eq!(tasks(&queue), [4, 5]);

        woken.clear();
        drain_due(&mut queue, 6, |t| woken.push(t.as_u64()));
        assert_eq!(woken, [4]);
    }

    #[test]
    fn drain_wakes_overdue_entries() {
        let mut queue = Default::default();
        enqueue(&mut queue, entry(1, 3));
        enqueue(&mut queue, entry(2, 8));

        let mut woken = Vec::new();
        drain_due(&mut queue, 10, |t| woken.push(t.as_u64()));
        assert_eq!(woken, [1, 2]);
        assert!(queue.is_empty());

        drain_due(&mut queue, 11, |t| woken.push(t.as_u64()));
        assert_eq!(woken, [1, 2]);
    }

    #[test]
    fn tick_conversion_clamps() {
        assert_eq!(to_ticks(1000, 1000), TIMER_FREQ);
        assert_eq!(to_ticks(999, 1000), TIMER_FREQ * 999 / 1000);
        assert_eq!(to_ticks(i64::MAX, 1000), i64::MAX);
        let long = to_ticks(i64::MAX / 10, 1000);
        assert!(long > 0 && long <= i64::MAX / 10);
        assert_eq!(to_ticks(2_000_000_000, 1_000_000_000), 2 * TIMER_FREQ);
        assert!(to_ticks(i64::MIN, 1000) < 0);
    }
}
