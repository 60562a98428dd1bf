//! Seed scenario 7: the allocator is configured to fail on its very
//! next call; `init_kernel`'s idle-task stack allocation is that call,
//! so initialization fails cleanly instead of leaving a half-built
//! kernel.

use tempus::{allocator, kernel, KernelError};

#[test]
fn init_kernel_fails_when_the_allocator_is_exhausted() {
    allocator::set_failure_period(1);
    let result = kernel::init_kernel();
    allocator::set_failure_period(0);

    assert_eq!(result, Err(KernelError::Fail));
}
