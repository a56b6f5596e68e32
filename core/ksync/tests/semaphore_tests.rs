use std::sync::{
    Arc, Once,
    atomic::{AtomicU32, AtomicUsize, Ordering},
};

use ksync::Semaphore;
use ktask::{self as thread, host};

static INIT: Once = Once::new();

#[test]
fn semaphore_basic() {
    INIT.call_once(thread::init_scheduler);

    let sem = Semaphore::new(3);

    assert_eq!(sem.value(), 3);

    let _g1 = sem.down_guard();
    assert_eq!(sem.value(), 2);

    let _g2 = sem.down_guard();
    assert_eq!(sem.value(), 1);

    let _g3 = sem.down_guard();
    assert_eq!(sem.value(), 0);

    // All permits used
    assert!(!sem.try_down());

    drop(_g1);
    assert_eq!(sem.value(), 1);

    // One permit released
    assert!(sem.try_down());
}

#[test]
fn semaphore_down_up() {
    INIT.call_once(thread::init_scheduler);

    let sem = Semaphore::new(2);

    sem.down();
    assert_eq!(sem.value(), 1);

    sem.down();
    assert_eq!(sem.value(), 0);

    sem.up();
    assert_eq!(sem.value(), 1);

    sem.up();
    assert_eq!(sem.value(), 2);

    // nothing caps the count
    sem.up();
    assert_eq!(sem.value(), 3);
}

#[test]
fn semaphore_try_down() {
    INIT.call_once(thread::init_scheduler);

    let sem = Semaphore::new(1);

    assert!(sem.try_down());
    assert_eq!(sem.value(), 0);

    assert!(!sem.try_down());
    assert_eq!(sem.value(), 0);

    sem.up();
    assert_eq!(sem.value(), 1);

    assert!(sem.try_down());
}

#[test]
fn semaphore_guard_drop() {
    INIT.call_once(thread::init_scheduler);

    let sem = Semaphore::new(1);

    {
        let _g = sem.down_guard();
        assert_eq!(sem.value(), 0);
    }

    // Guard dropped, permit should be released
    assert_eq!(sem.value(), 1);
}

#[test]
fn semaphore_up_hands_permit_to_waiter() {
    INIT.call_once(thread::init_scheduler);

    let sem = Arc::new(Semaphore::new(0));
    let b = {
        let sem = sem.clone();
        thread::spawn(move || sem.down())
    };
    host::wait_blocked(b.id());
    assert_eq!(sem.waiter_count(), 1);

    // C ups: B becomes runnable and the count never goes up
    let c = {
        let sem = sem.clone();
        thread::spawn(move || sem.up())
    };
    c.join();
    assert_eq!(sem.value(), 0);
    assert_eq!(sem.waiter_count(), 0);
    b.join();
    assert_eq!(sem.value(), 0);
}

#[test]
fn semaphore_permits_are_conserved() {
    INIT.call_once(thread::init_scheduler);

    const INITIAL: usize = 2;
    const NUM_TASKS: usize = 8;
    const NUM_ITERS: usize = 200;
    static UPS: AtomicUsize = AtomicUsize::new(0);
    static DOWNS: AtomicUsize = AtomicUsize::new(0);

    let sem = Arc::new(Semaphore::new(INITIAL));
    let handles: Vec<_> = (0..NUM_TASKS)
        .map(|i| {
            let sem = sem.clone();
            thread::spawn(move || {
                for _ in 0..NUM_ITERS {
                    if i % 2 == 0 {
                        sem.down();
                        // every permit taken was initial or already given back
                        let downs = DOWNS.fetch_add(1, Ordering::SeqCst) + 1;
                        assert!(downs <= INITIAL + UPS.load(Ordering::SeqCst));
                    } else {
                        UPS.fetch_add(1, Ordering::SeqCst);
                        sem.up();
                    }
                    if fastrand::u8(0..3) == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join();
    }

    assert_eq!(sem.waiter_count(), 0);
    assert_eq!(
        sem.value(),
        INITIAL + UPS.load(Ordering::SeqCst) - DOWNS.load(Ordering::SeqCst)
    );
}

#[test]
fn semaphore_concurrent() {
    INIT.call_once(thread::init_scheduler);

    static COUNTER: AtomicU32 = AtomicU32::new(0);
    static MAX_COUNTER: AtomicU32 = AtomicU32::new(0);
    let sem = Arc::new(Semaphore::new(3));
    let mut handles = vec![];

    for _ in 0..10 {
        let sem = sem.clone();
        let handle = thread::spawn(move || {
            let _g = sem.down_guard();

            let count = COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
            MAX_COUNTER.fetch_max(count, Ordering::SeqCst);

            // Verify at most 3 concurrent accesses
            assert!(count <= 3, "too many concurrent accesses: {}", count);

            thread::yield_now();

            COUNTER.fetch_sub(1, Ordering::SeqCst);
        });
        handles.push(handle);
    }

    for h in handles {
        h.join();
    }

    assert!(MAX_COUNTER.load(Ordering::SeqCst) <= 3);
    assert_eq!(COUNTER.load(Ordering::SeqCst), 0);
    assert_eq!(sem.value(), 3);
}

#[test]
fn semaphore_up_from_interrupt() {
    INIT.call_once(thread::init_scheduler);

    const VECTOR: usize = 0x90;
    static SEM: Semaphore = Semaphore::new(0);

    fn handler() {
        assert!(!SEM.try_down());
        SEM.up();
    }
    assert!(kplat::interrupts::register(VECTOR, handler));

    let h = thread::spawn(|| SEM.down());
    host::wait_blocked(h.id());
    host::raise_irq(VECTOR);
    h.join();
    assert_eq!(SEM.value(), 0);
}

#[test]
#[should_panic(expected = "interrupt context")]
fn semaphore_down_in_interrupt_panics() {
    INIT.call_once(thread::init_scheduler);

    const VECTOR: usize = 0x91;
    static SEM: Semaphore = Semaphore::new(1);

    fn handler() {
        SEM.down();
    }
    assert!(kplat::interrupts::register(VECTOR, handler));
    host::raise_irq(VECTOR);
}

#[test]
fn semaphore_ping_pong() {
    INIT.call_once(thread::init_scheduler);

    const ROUNDS: usize = 10;
    static PING: Semaphore = Semaphore::new(0);
    static PONG: Semaphore = Semaphore::new(0);
    static RETURNED: AtomicUsize = AtomicUsize::new(0);

    let helper = thread::spawn(|| {
        for _ in 0..ROUNDS {
            PING.down();
            RETURNED.fetch_add(1, Ordering::SeqCst);
            PONG.up();
        }
    });

    for round in 1..=ROUNDS {
        PING.up();
        PONG.down();
        assert_eq!(RETURNED.load(Ordering::SeqCst), round);
    }
    helper.join();
    assert_eq!(PING.value(), 0);
    assert_eq!(PONG.value(), 0);
}
