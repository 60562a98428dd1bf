//! Critical-section abstraction.
//!
//! All shared kernel state (the three task lists, the current-task
//! pointer, the tick counter, every mailbox) is mutated only from
//! within a critical section. On `mcu` that means interrupts are
//! physically masked, exactly as in `cortex_m::interrupt::free`. On
//! `sim` there is no single hardware core serializing task threads, so
//! the critical section holds a real mutex for the duration of the
//! closure; a cooperative shadow flag (`port::sim::set_interrupts_enabled`)
//! additionally lets the background tick thread skip a tick cheaply
//! instead of blocking on the mutex, mirroring the original kernel's
//! `isrOnState` check in its X86 `timerInterrupt` branch.

#[cfg(feature = "mcu")]
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    cortex_m::interrupt::free(|_cs| f())
}

#[cfg(all(feature = "sim", not(feature = "mcu")))]
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = crate::port::sim::KERNEL_LOCK.lock().unwrap();
    crate::port::sim::set_interrupts_enabled(false);
    let r = f();
    crate::port::sim::set_interrupts_enabled(true);
    r
}
