//! A uniprocessor machine simulated on std threads.
//!
//! Each std thread is a task; ids are handed out lazily on first use. The
//! simulated CPU has one "IRQs disabled" token. A task that disables local
//! IRQs takes the token, nested disables only bump a per-task depth, and the
//! outermost restore gives the token back. While one task holds the token
//! no other task can enter a masked region and no interrupt can be raised,
//! which is exactly the exclusion a single CPU gets from `cli`.
//!
//! Tasks queue for the token in arrival order.
//!
//! Blocking follows the uniprocessor hand-off: [`TaskIf::block_current`]
//! gives the token up while the task sleeps, and queues for it again once the
//! task has been unblocked. Masking depth is per task,
//! so the interrupt state is restored when the task resumes.
//!
//! Interrupts are raised explicitly with [`raise_irq`], or by a free-running
//! clock started with [`start_periodic`]. Handlers run on the raising thread
//! with the token held and [`IrqIf::in_interrupt`] reporting `true`.

use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use kernel_guard::KernelGuardIf;
use kplat::{
    interrupts::{IrqHandler, IrqIf},
    io::PortIoIf,
};

use crate::{TaskId, TaskIf};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

struct Machine {
    irq_owner: Option<TaskId>,
    // FIFO hand-out of the token, so a polling task cannot starve the timer.
    next_ticket: u64,
    now_serving: u64,
    blocked: BTreeSet<TaskId>,
    priorities: BTreeMap<TaskId, i32>,
    handlers: BTreeMap<usize, IrqHandler>,
    port_writes: Vec<(u16, u8)>,
    timer_ticks: u64,
}

impl Machine {
    const fn new() -> Self {
        Self {
            irq_owner: None,
            next_ticket: 0,
            now_serving: 0,
            blocked: BTreeSet::new(),
            priorities: BTreeMap::new(),
            handlers: BTreeMap::new(),
            port_writes: Vec::new(),
            timer_ticks: 0,
        }
    }
}

static MACHINE: Mutex<Machine> = Mutex::new(Machine::new());
static CHANGED: Condvar = Condvar::new();

thread_local! {
    static TASK: Cell<Option<TaskId>> = const { Cell::new(None) };
    static IRQ_DEPTH: Cell<usize> = const { Cell::new(0) };
    static IN_IRQ: Cell<bool> = const { Cell::new(false) };
}

fn machine() -> MutexGuard<'static, Machine> {
    MACHINE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn wait(guard: MutexGuard<'static, Machine>) -> MutexGuard<'static, Machine> {
    CHANGED.wait(guard).unwrap_or_else(PoisonError::into_inner)
}

fn take_token(mut m: MutexGuard<'static, Machine>, me: TaskId) -> MutexGuard<'static, Machine> {
    let ticket = m.next_ticket;
    m.next_ticket += 1;
    while m.irq_owner.is_some() || m.now_serving != ticket {
        m = wait(m);
    }
    m.now_serving += 1;
    m.irq_owner = Some(me);
    m
}

fn alloc_id() -> TaskId {
    TaskId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

fn current_task() -> TaskId {
    TASK.with(|task| match task.get() {
        Some(id) => id,
        None => {
            let id = alloc_id();
            task.set(Some(id));
            id
        }
    })
}

fn save_disable() -> usize {
    let depth = IRQ_DEPTH.get();
    if depth == 0 {
        let me = current_task();
        drop(take_token(machine(), me));
    }
    IRQ_DEPTH.set(depth + 1);
    usize::from(depth == 0)
}

fn restore(flags: usize) {
    let depth = IRQ_DEPTH.get();
    assert!(depth > 0, "local_irq_restore without a matching save");
    debug_assert_eq!(flags != 0, depth == 1, "IRQ guards restored out of order");
    IRQ_DEPTH.set(depth - 1);
    if depth == 1 {
        machine().irq_owner = None;
        CHANGED.notify_all();
    }
}

/// The host implementation of every platform hook.
struct HostMachine;

#[crate_interface::impl_interface]
impl KernelGuardIf for HostMachine {
    fn local_irq_save_and_disable() -> usize {
        save_disable()
    }

    fn local_irq_restore(flags: usize) {
        restore(flags)
    }

    fn local_irq_enabled() -> bool {
        IRQ_DEPTH.get() == 0 && !IN_IRQ.get()
    }
}

#[crate_interface::impl_interface]
impl IrqIf for HostMachine {
    fn register(vector: usize, handler: IrqHandler) -> bool {
        machine().handlers.insert(vector, handler);
        true
    }

    fn in_interrupt() -> bool {
        IN_IRQ.get()
    }
}

#[crate_interface::impl_interface]
impl PortIoIf for HostMachine {
    fn outb(port: u16, value: u8) {
        machine().port_writes.push((port, value));
    }

    fn inb(_port: u16) -> u8 {
        0
    }
}

#[crate_interface::impl_interface]
impl TaskIf for HostMachine {
    fn current() -> TaskId {
        current_task()
    }

    fn block_current() {
        assert!(!IN_IRQ.get(), "blocking inside an interrupt handler");
        assert!(IRQ_DEPTH.get() > 0, "blocking with interrupts enabled");
        let me = current_task();
        let mut m = machine();
        m.blocked.insert(me);
        m.irq_owner = None;
        CHANGED.notify_all();
        while m.blocked.contains(&me) {
            m = wait(m);
        }
        drop(take_token(m, me));
    }

    fn unblock(task: TaskId) {
        assert!(IRQ_DEPTH.get() > 0, "unblocking with interrupts enabled");
        let removed = machine().blocked.remove(&task);
        assert!(removed, "{task} is not blocked");
        CHANGED.notify_all();
    }

    fn priority(task: TaskId) -> Option<i32> {
        machine().priorities.get(&task).copied()
    }

    fn timer_tick() {
        machine().timer_ticks += 1;
    }
}

/// Bring the simulated machine up. Idempotent.
pub fn init_scheduler() {
    let me = current_task();
    debug!("host machine up, boot task is {me}");
}

/// Let other host threads run. Only meaningful with IRQs enabled.
pub fn yield_now() {
    thread::yield_now();
}

/// An owned permission to join a spawned task.
pub struct JoinHandle<T> {
    id: TaskId,
    inner: thread::JoinHandle<T>,
}

impl<T> JoinHandle<T> {
    /// The id of the spawned task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Wait for the task to finish and return its result.
    ///
    /// A panic in the task is resumed on the joining thread.
    pub fn join(self) -> T {
        match self.inner.join() {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// Spawn a new task running `f`.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let id = alloc_id();
    let inner = thread::spawn(move || {
        TASK.set(Some(id));
        f()
    });
    JoinHandle { id, inner }
}

/// Leaves interrupt context and gives the token back, even on unwind.
struct IrqFrame {
    flags: usize,
}

impl Drop for IrqFrame {
    fn drop(&mut self) {
        IN_IRQ.set(false);
        restore(self.flags);
    }
}

/// Deliver interrupt `vector` on the calling thread.
///
/// # Panics
///
/// Panics if the caller has IRQs disabled or no handler is registered.
pub fn raise_irq(vector: usize) {
    assert!(!IN_IRQ.get(), "nested interrupt delivery");
    assert_eq!(IRQ_DEPTH.get(), 0, "interrupt raised with IRQs disabled");
    let frame = IrqFrame {
        flags: save_disable(),
    };
    IN_IRQ.set(true);
    let handler = machine().handlers.get(&vector).copied();
    match handler {
        Some(handler) => handler(),
        None => panic!("Unknown interrupt #{vector}"),
    }
    drop(frame);
}

/// A free-running interrupt source. Stops when dropped.
pub struct PeriodicIrq {
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Drop for PeriodicIrq {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Raise `vector` every `period` on a dedicated thread.
pub fn start_periodic(vector: usize, period: Duration) -> PeriodicIrq {
    let stop = Arc::new(AtomicBool::new(false));
    let worker = {
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                thread::sleep(period);
                raise_irq(vector);
            }
        })
    };
    PeriodicIrq {
        stop,
        worker: Some(worker),
    }
}

/// Whether `task` is currently blocked.
pub fn is_blocked(task: TaskId) -> bool {
    machine().blocked.contains(&task)
}

/// Wait until `task` has blocked.
pub fn wait_blocked(task: TaskId) {
    let mut m = machine();
    while !m.blocked.contains(&task) {
        m = wait(m);
    }
}

/// Give `task` a scheduling priority. Larger is more urgent.
pub fn set_priority(task: TaskId, priority: i32) {
    machine().priorities.insert(task, priority);
}

/// Every `(port, value)` written with `outb` so far.
pub fn port_writes() -> Vec<(u16, u8)> {
    machine().port_writes.clone()
}

/// Number of times the scheduler's per-tick hook ran.
pub fn timer_ticks() -> u64 {
    machine().timer_ticks
}
