//! Instrumented global allocator.
//!
//! Wraps an underlying allocator and can be configured to fail
//! deterministically every Nth call. This is the Rust expression of the
//! original kernel's `OS_malloc`/`OS_calloc` fault-injection counters:
//! a `period` of zero disables injection, a positive `period` fails the
//! call whose 1-based index is a multiple of `period` and then resets
//! the counter.

use core::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Wraps `A` and counts allocation calls for fault injection.
pub struct InstrumentedAllocator<A> {
    inner: A,
    period: AtomicUsize,
    counter: AtomicUsize,
}

impl<A> InstrumentedAllocator<A> {
    pub const fn new(inner: A) -> Self {
        InstrumentedAllocator {
            inner,
            period: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        }
    }

    /// Set the failure period. `0` disables fault injection. Resets the
    /// call counter, matching `OS_malloc_setPeriod`.
    pub fn set_period(&self, period: usize) {
        self.counter.store(0, Ordering::SeqCst);
        self.period.store(period, Ordering::SeqCst);
    }

    /// Returns `true` (and bumps the counter) if this call should fail.
    fn should_fail(&self) -> bool {
        let period = self.period.load(Ordering::SeqCst);
        if period == 0 {
            return false;
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= period {
            self.counter.store(0, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for InstrumentedAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if self.should_fail() {
            return core::ptr::null_mut();
        }
        self.inner.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if self.should_fail() {
            return core::ptr::null_mut();
        }
        self.inner.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if self.should_fail() {
            return core::ptr::null_mut();
        }
        self.inner.realloc(ptr, layout, new_size)
    }
}

/// Bump allocator over a fixed static arena, for targets with no system
/// allocator (`mcu`). Never frees; `dealloc` is a no-op, matching the
/// bump-allocator idiom used for bare-metal kernel heaps.
#[cfg(feature = "mcu")]
pub struct BumpAllocator<const N: usize> {
    arena: core::cell::UnsafeCell<[u8; N]>,
    offset: AtomicUsize,
}

#[cfg(feature = "mcu")]
unsafe impl<const N: usize> Sync for BumpAllocator<N> {}

#[cfg(feature = "mcu")]
impl<const N: usize> BumpAllocator<N> {
    pub const fn new() -> Self {
        BumpAllocator {
            arena: core::cell::UnsafeCell::new([0u8; N]),
            offset: AtomicUsize::new(0),
        }
    }
}

#[cfg(feature = "mcu")]
unsafe impl<const N: usize> GlobalAlloc for BumpAllocator<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let base = self.arena.get() as *mut u8;
        let align = layout.align();
        loop {
            let current = self.offset.load(Ordering::SeqCst);
            let aligned = (current + align - 1) & !(align - 1);
            let next = aligned + layout.size();
            if next > N {
                return core::ptr::null_mut();
            }
            if self
                .offset
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return base.add(aligned);
            }
        }
    }

    unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
}

#[cfg(feature = "mcu")]
const HEAP_SIZE: usize = 32 * 1024;

#[cfg(feature = "mcu")]
#[global_allocator]
static ALLOCATOR: InstrumentedAllocator<BumpAllocator<HEAP_SIZE>> =
    InstrumentedAllocator::new(BumpAllocator::new());

#[cfg(all(feature = "sim", not(feature = "mcu")))]
#[global_allocator]
static ALLOCATOR: InstrumentedAllocator<std::alloc::System> =
    InstrumentedAllocator::new(std::alloc::System);

/// Set the global allocator's failure period. `0` disables injection.
pub fn set_failure_period(period: usize) {
    ALLOCATOR.set_period(period);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let a = InstrumentedAllocator::new(std::alloc::System);
        assert!(!a.should_fail());
        assert!(!a.should_fail());
    }

    #[test]
    fn fails_every_nth_call() {
        let a = InstrumentedAllocator::new(std::alloc::System);
        a.set_period(3);
        assert!(!a.should_fail());
        assert!(!a.should_fail());
        assert!(a.should_fail());
        assert!(!a.should_fail());
        assert!(!a.should_fail());
        assert!(a.should_fail());
    }
}
