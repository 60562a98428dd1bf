//! Kernel error vocabulary.
//!
//! Replaces the original C kernel's `exception` typedef (a bare `int`
//! compared against `FAIL`/`OK`/`DEADLINE_REACHED`/`NOT_EMPTY` sentinels)
//! with a real enum so call sites can match instead of compare.

/// Failure outcomes shared by every public kernel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A precondition was violated (invalid argument, wrong operating
    /// mode) or an allocation failed.
    Fail,
    /// A mailbox could not be removed because it still holds queued
    /// messages or blocked parties.
    NotEmpty,
}

/// Outcome of an operation that can be interrupted by a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The operation completed normally.
    Completed,
    /// The calling task's deadline was reached before the operation
    /// completed; any partial state (e.g. a queued mailbox message) was
    /// withdrawn.
    DeadlineReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_error_equality() {
        assert_eq!(KernelError::Fail, KernelError::Fail);
        assert_ne!(KernelError::Fail, KernelError::NotEmpty);
    }
}
