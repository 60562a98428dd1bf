//! Host-OS simulation port: one thread per task.
//!
//! Grounded on the original kernel's `_X86_` branch, where `run()` is
//! driven by a dedicated thread calling `timerInterrupt()` periodically
//! rather than a hardware timer ISR. Each task is a real OS thread; a
//! `(Mutex<bool>, Condvar)` pair per task hands execution from one
//! thread to another, standing in for the Cortex-M4 port's PendSV
//! save/restore.
//!
//! True involuntary preemption of a running, compute-bound OS thread
//! is not something safe Rust can do without signals; the tick thread
//! always updates scheduler state under `KERNEL_LOCK` (so every kernel
//! invariant holds regardless), but it can only *request* that the
//! outgoing task park itself. In practice every task body suspends
//! voluntarily at `wait`/`set_deadline`/mailbox calls, which is where
//! `switch_to` below actually hands the CPU to the next task — this
//! mirrors the suspension points named in the spec's concurrency model.

use alloc::collections::BTreeMap;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::task::TaskId;

/// Serializes access to kernel-global state across task threads and
/// the tick thread. Held for the duration of every `critical_section`.
pub static KERNEL_LOCK: Mutex<()> = Mutex::new(());

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn set_interrupts_enabled(enabled: bool) {
    INTERRUPTS_ENABLED.store(enabled, Ordering::SeqCst);
}

fn interrupts_enabled() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::SeqCst)
}

pub fn isr_off() {
    set_interrupts_enabled(false);
}

pub fn isr_on() {
    set_interrupts_enabled(true);
}

type Parker = Arc<(Mutex<bool>, Condvar)>;

static PARKERS: Mutex<BTreeMap<TaskId, Parker>> = Mutex::new(BTreeMap::new());

fn parker_for(id: TaskId) -> Parker {
    let mut table = PARKERS.lock().unwrap();
    table
        .entry(id)
        .or_insert_with(|| Arc::new((Mutex::new(false), Condvar::new())))
        .clone()
}

thread_local! {
    static CURRENT_TASK: core::cell::Cell<Option<TaskId>> = core::cell::Cell::new(None);
}

/// The stack buffer allocated by `task::TaskDescriptor` is unused on
/// `sim` — each task is a real OS thread with its own native stack.
/// Returns a null pointer for API symmetry with `cortex_m4::init_stack`.
pub unsafe fn init_stack(_stack: &mut [u8], _entry: extern "C" fn() -> !) -> *mut u32 {
    core::ptr::null_mut()
}

/// Spawn the OS thread backing `id`, parked until it is first made
/// runnable by `switch_to`/`start_first`.
pub fn spawn_task(id: TaskId, entry: extern "C" fn() -> !) {
    let parker = parker_for(id);
    std::thread::Builder::new()
        .name(alloc::format!("task-{id}"))
        .spawn(move || {
            CURRENT_TASK.with(|c| c.set(Some(id)));
            park_until_runnable(&parker);
            entry();
        })
        .expect("failed to spawn task thread");
}

fn park_until_runnable(parker: &Parker) {
    let (lock, cvar) = &**parker;
    let mut runnable = lock.lock().unwrap();
    while !*runnable {
        runnable = cvar.wait(runnable).unwrap();
    }
    *runnable = false;
}

fn make_runnable(id: TaskId) {
    let parker = parker_for(id);
    let (lock, cvar) = &*parker;
    let mut runnable = lock.lock().unwrap();
    *runnable = true;
    cvar.notify_all();
}

/// Hand off execution from `current` to `next`. If they are the same
/// task this is a no-op (the caller remains the running task). Must be
/// called outside the kernel lock, since it blocks.
pub fn switch_to(current: Option<TaskId>, next: TaskId) {
    if current == Some(next) {
        return;
    }
    make_runnable(next);
    if let Some(current) = current {
        let parker = parker_for(current);
        park_until_runnable(&parker);
    }
}

/// Wake the first scheduled task and park the calling (non-task)
/// thread forever, matching the `-> !` contract of `kernel::run`.
pub fn start_first(id: TaskId) -> ! {
    make_runnable(id);
    loop {
        std::thread::park_timeout(Duration::from_secs(3600));
    }
}

/// Background tick source: sleeps the nominal tick period and invokes
/// the scheduler's tick handler, skipping ticks while the shadow
/// interrupt-enable flag is off (mirrors `isrOnState` in the original
/// X86 `timerInterrupt` branch).
pub fn spawn_tick_thread() {
    std::thread::spawn(|| loop {
        std::thread::sleep(Duration::from_millis(crate::config::SIM_TICK_PERIOD_MS));
        if !interrupts_enabled() {
            continue;
        }
        let _guard = KERNEL_LOCK.lock().unwrap();
        let kernel = unsafe { crate::kernel::kernel_mut() };
        kernel.scheduler.tick();
    });
}

pub fn trace_with_level(level: &str, args: fmt::Arguments) {
    eprintln!("[{level}] {args}");
}

pub fn current_task() -> Option<TaskId> {
    CURRENT_TASK.with(|c| c.get())
}
