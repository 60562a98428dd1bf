//! Task descriptor and task list entry.
//!
//! Replaces the original C kernel's `TCB` (inline stack + context array,
//! sized per architecture via `#ifdef`) and `listobj` (task pointer,
//! sort key, back-pointer to a pending message, list links) with two
//! Rust types: [`TaskDescriptor`] owns the stack and saved execution
//! state, [`TaskListEntry`] owns a descriptor plus the scheduling
//! metadata and intrusive links `list::TaskList` operates on.

use alloc::alloc::Layout;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::config::STACK_SIZE;
use crate::mailbox::Message;

/// Opaque identifier for a task, assigned at creation.
pub type TaskId = usize;

/// Owns a task's stack and saved execution state.
///
/// On the `mcu` port, `stack_pointer` points into `stack` at the
/// position saved by the last context switch; the port's assembly
/// reads/writes it directly. On the `sim` port a task is a real OS
/// thread and `stack_pointer` is unused (kept null for API symmetry).
pub struct TaskDescriptor {
    stack: Vec<u8>,
    pub stack_pointer: *mut u32,
    pub entry: extern "C" fn() -> !,
}

impl TaskDescriptor {
    /// Allocate a fresh stack and lay out the initial context so the
    /// task resumes at `entry` the first time it's switched in.
    ///
    /// Allocates the stack through a raw, fallible call into the
    /// global allocator (rather than `vec![0u8; N]`, which aborts on
    /// failure) so allocator exhaustion during task creation surfaces
    /// as `KernelError::Fail` instead of halting the process — this is
    /// the dominant allocation in a task's footprint, so it is the one
    /// the instrumented allocator's fault injection is expected to hit.
    pub fn try_new(entry: extern "C" fn() -> !) -> Option<Self> {
        let layout = Layout::array::<u8>(STACK_SIZE).expect("STACK_SIZE fits a Layout");
        let ptr = unsafe { alloc::alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return None;
        }
        let mut stack = unsafe { Vec::from_raw_parts(ptr, STACK_SIZE, STACK_SIZE) };
        let stack_pointer = unsafe { crate::port::active::init_stack(&mut stack, entry) };
        Some(TaskDescriptor {
            stack,
            stack_pointer,
            entry,
        })
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        extern "C" fn noop() -> ! {
            loop {}
        }
        TaskDescriptor {
            stack: alloc::vec![0u8; 64],
            stack_pointer: core::ptr::null_mut(),
            entry: noop,
        }
    }
}

/// One entry on a kernel task list: a task descriptor plus the
/// scheduling metadata the lists sort/act on. A task entry is linked
/// into at most one of {ready, waiting, timer} at any time.
pub struct TaskListEntry {
    pub id: TaskId,
    pub task: TaskDescriptor,
    /// Absolute tick value this task's deadline is set to.
    pub deadline: u64,
    /// Absolute tick value at which a timer sleep expires. `None`
    /// unless this entry is currently on the timer list.
    pub wake_tick: Option<u64>,
    /// The pending mailbox message this task is blocked on, if any.
    pub pending_message: Option<NonNull<Message>>,
    pub prev: Option<NonNull<TaskListEntry>>,
    pub next: Option<NonNull<TaskListEntry>>,
}

// SAFETY: only ever touched from within a kernel critical section.
unsafe impl Send for TaskListEntry {}

impl TaskListEntry {
    /// Fallible constructor: returns `None` if the stack allocation
    /// fails (instrumented-allocator fault injection, or genuine OOM).
    pub fn try_new(id: TaskId, entry: extern "C" fn() -> !, deadline: u64) -> Option<Box<Self>> {
        let task = TaskDescriptor::try_new(entry)?;
        Some(Box::new(TaskListEntry {
            id,
            task,
            deadline,
            wake_tick: None,
            pending_message: None,
            prev: None,
            next: None,
        }))
    }

    #[cfg(test)]
    pub fn new(id: TaskId, entry: extern "C" fn() -> !, deadline: u64) -> Box<Self> {
        Self::try_new(id, entry, deadline).expect("test allocation should not fail")
    }

    pub fn idle(id: TaskId, entry: extern "C" fn() -> !) -> Option<Box<Self>> {
        Self::try_new(id, entry, crate::config::IDLE_DEADLINE)
    }
}

#[cfg(test)]
impl TaskListEntry {
    /// Minimal entry for list-invariant tests.
    pub fn for_test(deadline: u64) -> Self {
        TaskListEntry {
            id: 0,
            task: TaskDescriptor::for_test(),
            deadline,
            wake_tick: Some(deadline),
            pending_message: None,
            prev: None,
            next: None,
        }
    }
}
