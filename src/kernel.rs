//! Kernel public API.
//!
//! Grounded on `original_source/SRC_OS/source/kernel.c` almost
//! line-for-line for control flow: `init_kernel`, `create_task`,
//! `terminate`, `run`, `wait`, `set_deadline`, `deadline`, `ticks`,
//! `set_ticks`, and the mailbox operations all mirror the C functions
//! of the same name, adapted to Rust ownership (`Box`/`NonNull`
//! intrusive lists instead of raw `listobj*`) and to a real error enum
//! instead of `int` sentinels.
//!
//! ## Startup sequence
//!
//! ```text
//! init_kernel()       - allocate the idle task, enter Init mode
//!   create_task() * N - admit tasks directly onto the ready list
//!   run()              - enter Running mode, launch the first task
//! ```

use alloc::boxed::Box;
use core::ptr::NonNull;

use crate::error::{KernelError, WaitOutcome};
use crate::mailbox::{Kind, Mailbox, MailboxHandle, Message, MessageStatus, Payload};
use crate::scheduler::Scheduler;
use crate::sync::critical_section;
use crate::task::{TaskId, TaskListEntry};
use crate::{kerror, klog, kwarn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Uninitialized,
    Init,
    Running,
}

/// Top-level kernel state: the scheduler's three lists plus the
/// operating mode. A terminated task's entry is parked here rather
/// than freed immediately — see `terminate`'s doc comment.
struct Kernel {
    scheduler: Scheduler,
    mode: Mode,
    zombie: Option<Box<TaskListEntry>>,
}

static mut KERNEL: Kernel = Kernel {
    scheduler: Scheduler::new(),
    mode: Mode::Uninitialized,
    zombie: None,
};

/// # Safety
/// Must only be called from within a critical section, or from a port
/// ISR/handler that is itself serialized with respect to one.
pub(crate) unsafe fn kernel_mut() -> &'static mut Kernel {
    &mut KERNEL
}

// ---------------------------------------------------------------------------
// Reschedule primitive
// ---------------------------------------------------------------------------

/// Ask the port layer to switch execution to whichever task reassessment
/// now selects. On `mcu` this is a deferred, interrupt-driven switch
/// (`PendSV`'s handler performs the actual reassessment, see
/// `port::cortex_m4::do_context_switch`'s doc comment for why). On
/// `sim` reassessment and the thread handoff both happen here, since
/// there is no hardware exception to defer into.
///
/// Also called directly from the idle task's loop body on `sim`: the
/// background tick thread updates `scheduler.current` under the kernel
/// lock but cannot itself force a busy OS thread to park (see
/// `port::sim`'s module doc), so idle is the one task that polls this
/// on every iteration to notice a tick-driven wakeup and hand off.
pub(crate) fn request_switch() {
    #[cfg(feature = "mcu")]
    {
        crate::port::cortex_m4::trigger_pendsv();
    }
    #[cfg(all(feature = "sim", not(feature = "mcu")))]
    {
        let next_id = critical_section(|| {
            let k = unsafe { kernel_mut() };
            k.scheduler.reassess();
            k.scheduler
                .current_entry()
                .map(|e| unsafe { e.as_ref().id })
        });
        if let Some(next_id) = next_id {
            crate::port::sim::switch_to(crate::port::sim::current_task(), next_id);
        }
    }
}

/// Clear `owner`'s pending-message pointer and move it onto the ready
/// list. `owner` may already have been moved to the ready list by a
/// tick-driven `reassess` (its own deadline expired in the window
/// between being queued and a peer completing the rendezvous); in
/// that case `waiting.remove` returns `None` and there is nothing left
/// to reinsert.
fn wake_blocked(k: &mut Kernel, mut owner: NonNull<TaskListEntry>) {
    unsafe {
        owner.as_mut().pending_message = None;
    }
    if let Some(entry) = k.scheduler.waiting.remove(owner) {
        k.scheduler.ready.insert_by_deadline(entry);
    }
}

// ---------------------------------------------------------------------------
// Task administration
// ---------------------------------------------------------------------------

/// Initialize the kernel: allocate the idle task and enter `Init` mode.
/// Must be called exactly once, before any other kernel function.
pub fn init_kernel() -> Result<(), KernelError> {
    let idle_id = critical_section(|| {
        let k = unsafe { kernel_mut() };
        if k.mode != Mode::Uninitialized {
            return Err(KernelError::Fail);
        }
        k.scheduler = Scheduler::new();
        let idle_id = k.scheduler.alloc_task_id();
        let idle = crate::scheduler::idle_task_body;
        let idle_entry = TaskListEntry::idle(idle_id, idle).ok_or_else(|| {
            kerror!("init_kernel: failed to allocate the idle task");
            KernelError::Fail
        })?;
        k.scheduler.ready.insert_by_deadline(idle_entry);
        k.scheduler.reassess();
        k.mode = Mode::Init;
        Ok(idle_id)
    })?;

    #[cfg(all(feature = "sim", not(feature = "mcu")))]
    crate::port::sim::spawn_task(idle_id, crate::scheduler::idle_task_body);

    klog!("kernel initialized, idle task id={idle_id}");
    Ok(())
}

/// Admit a new task. In `Init` mode it is simply inserted onto the
/// ready list; in `Running` mode the caller may be preempted by it
/// immediately if its deadline is earlier.
pub fn create_task(entry: extern "C" fn() -> !, deadline: u64) -> Result<TaskId, KernelError> {
    if deadline == 0 {
        return Err(KernelError::Fail);
    }
    let (id, now_running) = critical_section(|| {
        let k = unsafe { kernel_mut() };
        if k.mode == Mode::Uninitialized {
            return Err(KernelError::Fail);
        }
        let id = k.scheduler.alloc_task_id();
        let task_entry = TaskListEntry::try_new(id, entry, deadline).ok_or(KernelError::Fail)?;
        k.scheduler.ready.insert_by_deadline(task_entry);
        Ok((id, k.mode == Mode::Running))
    })?;

    #[cfg(all(feature = "sim", not(feature = "mcu")))]
    crate::port::sim::spawn_task(id, entry);

    klog!("created task {id} deadline={deadline}");
    if now_running {
        request_switch();
    }
    Ok(id)
}

/// Remove the running task permanently. Never returns.
///
/// The outgoing entry is parked in `Kernel::zombie` rather than freed
/// immediately: on `mcu`, `PendSV`'s `save_current_context` still
/// writes the task's final (meaningless) stack pointer into it after
/// this function triggers the switch, so the backing allocation must
/// outlive that write. It is reclaimed on the next `terminate` call.
pub fn terminate() -> ! {
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        let current = k
            .scheduler
            .current_entry()
            .expect("terminate called without a running task");
        let removed = k
            .scheduler
            .ready
            .remove(current)
            .expect("the running task is always on the ready list");
        debug_assert!(
            removed.pending_message.is_none(),
            "a task cannot terminate while a rendezvous message is still enqueued"
        );
        if let Some(previous_zombie) = k.zombie.replace(removed) {
            drop(previous_zombie);
        }
        klog!("task {} terminated", unsafe { current.as_ref().id });
    });
    request_switch();
    unreachable!("a terminated task's stack is never resumed")
}

/// Enter `Running` mode and launch the first task. Never returns on
/// success; returns `Err` if called before `init_kernel`/outside
/// `Init` mode (the original C `run()` silently does nothing in that
/// case — this port makes the failure explicit instead).
pub fn run() -> Result<core::convert::Infallible, KernelError> {
    let first_id = critical_section(|| {
        let k = unsafe { kernel_mut() };
        if k.mode != Mode::Init {
            return Err(KernelError::Fail);
        }
        k.mode = Mode::Running;
        k.scheduler.reassess();
        let head = k
            .scheduler
            .current_entry()
            .expect("init_kernel guarantees a ready head");
        Ok(unsafe { head.as_ref().id })
    })?;

    klog!("kernel running, first task id={first_id}");

    #[cfg(all(feature = "sim", not(feature = "mcu")))]
    {
        crate::port::sim::spawn_tick_thread();
        crate::port::sim::start_first(first_id);
    }

    #[cfg(feature = "mcu")]
    {
        let sp = critical_section(|| {
            let k = unsafe { kernel_mut() };
            let current = k
                .scheduler
                .current_entry()
                .expect("set immediately above");
            unsafe { current.as_ref().task.stack_pointer }
        });
        unsafe { crate::port::cortex_m4::start_first(sp) }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Put the running task to sleep for `n_ticks`. Returns
/// `WaitOutcome::DeadlineReached` if its deadline passed before the
/// sleep period elapsed.
pub fn wait(n_ticks: u64) -> Result<WaitOutcome, KernelError> {
    if n_ticks == 0 {
        return Err(KernelError::Fail);
    }
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        let current = k
            .scheduler
            .current_entry()
            .expect("wait called without a running task");
        let mut entry = k
            .scheduler
            .ready
            .remove(current)
            .expect("the running task is always on the ready list");
        entry.wake_tick = Some(k.scheduler.ticks + n_ticks);
        k.scheduler.timer.insert_by_wake(entry);
    });

    request_switch();

    Ok(critical_section(|| {
        let k = unsafe { kernel_mut() };
        let current = k
            .scheduler
            .current_entry()
            .expect("the resumed task is always current");
        let (deadline, ticks) = unsafe { (current.as_ref().deadline, k.scheduler.ticks) };
        if ticks >= deadline {
            WaitOutcome::DeadlineReached
        } else {
            WaitOutcome::Completed
        }
    }))
}

pub fn set_deadline(new_deadline: u64) {
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        if let Some(current) = k.scheduler.current_entry() {
            let mut entry = k
                .scheduler
                .ready
                .remove(current)
                .expect("the running task is always on the ready list");
            entry.deadline = new_deadline;
            k.scheduler.ready.insert_by_deadline(entry);
        }
    });
    request_switch();
}

pub fn deadline() -> u64 {
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        k.scheduler
            .current_entry()
            .map(|e| unsafe { e.as_ref().deadline })
            .unwrap_or(0)
    })
}

pub fn ticks() -> u64 {
    critical_section(|| unsafe { kernel_mut() }.scheduler.ticks)
}

pub fn set_ticks(new_ticks: u64) {
    critical_section(|| unsafe { kernel_mut() }.scheduler.ticks = new_ticks)
}

// ---------------------------------------------------------------------------
// Mailboxes
// ---------------------------------------------------------------------------

pub fn create_mailbox(max_messages: usize, data_size: usize) -> Result<MailboxHandle, KernelError> {
    if max_messages == 0 || data_size == 0 {
        return Err(KernelError::Fail);
    }
    critical_section(|| {
        let boxed = Mailbox::new(max_messages, data_size);
        Ok(MailboxHandle(NonNull::from(Box::leak(boxed))))
    })
}

pub fn remove_mailbox(handle: MailboxHandle) -> Result<(), KernelError> {
    critical_section(|| {
        let mbox = unsafe { handle.0.as_ref() };
        if !mbox.is_idle() {
            return Err(KernelError::NotEmpty);
        }
        unsafe {
            drop(Box::from_raw(handle.0.as_ptr()));
        }
        Ok(())
    })
}

pub fn no_messages(handle: MailboxHandle) -> usize {
    critical_section(|| unsafe { handle.0.as_ref() }.no_messages())
}

/// Synchronous send: blocks until a receiver collects `data`, or the
/// calling task's deadline passes first.
pub fn send_wait(handle: MailboxHandle, data: &[u8]) -> Result<WaitOutcome, KernelError> {
    let completed = critical_section(|| {
        let k = unsafe { kernel_mut() };
        let mbox = unsafe { &mut *handle.0.as_ptr() };
        if data.len() != mbox.data_size || mbox.n_messages != 0 {
            return Err(KernelError::Fail);
        }
        if mbox.n_blocked < 0 {
            let mut msg = mbox
                .pop_front_if(Kind::BlockedReceiver)
                .expect("n_blocked < 0 implies a queued receiver");
            unsafe {
                core::ptr::copy_nonoverlapping(data.as_ptr(), msg.payload.as_mut_ptr(), mbox.data_size);
            }
            msg.status = MessageStatus::Completed;
            mbox.n_blocked += 1;
            let owner = msg.owner.expect("a blocked receiver's message always has an owner");
            wake_blocked(k, owner);
            Ok(true)
        } else {
            let current = k
                .scheduler
                .current_entry()
                .expect("send_wait called without a running task");
            let msg = Box::new(Message {
                kind: Kind::BlockedSender,
                payload: Payload::Borrowed(data.as_ptr() as *mut u8, data.len()),
                status: MessageStatus::Pending,
                owner: Some(current),
            });
            let msg_ptr = mbox.push_back(msg);
            mbox.n_blocked += 1;
            let mut entry = k
                .scheduler
                .ready
                .remove(current)
                .expect("the running task is always on the ready list");
            entry.pending_message = NonNull::new(msg_ptr);
            k.scheduler.waiting.insert_by_deadline(entry);
            Ok(false)
        }
    })?;

    if completed {
        request_switch();
        return Ok(WaitOutcome::Completed);
    }

    request_switch();
    withdraw_if_expired(handle)
}

/// Synchronous receive: symmetric to `send_wait`.
pub fn receive_wait(handle: MailboxHandle, data: &mut [u8]) -> Result<WaitOutcome, KernelError> {
    let completed = critical_section(|| {
        let k = unsafe { kernel_mut() };
        let mbox = unsafe { &mut *handle.0.as_ptr() };
        if data.len() != mbox.data_size {
            return Err(KernelError::Fail);
        }
        match mbox.front_kind() {
            Some(Kind::BlockedSender) => {
                let msg = mbox.pop_front_if(Kind::BlockedSender).unwrap();
                unsafe {
                    core::ptr::copy_nonoverlapping(msg.payload.as_ptr(), data.as_mut_ptr(), mbox.data_size);
                }
                mbox.n_blocked -= 1;
                let owner = msg.owner.expect("a blocked sender's message always has an owner");
                wake_blocked(k, owner);
                Ok(true)
            }
            Some(Kind::Buffered) => {
                let msg = mbox.pop_front_if(Kind::Buffered).unwrap();
                unsafe {
                    core::ptr::copy_nonoverlapping(msg.payload.as_ptr(), data.as_mut_ptr(), mbox.data_size);
                }
                mbox.n_messages -= 1;
                Ok(true)
            }
            Some(Kind::BlockedReceiver) | None => {
                let current = k
                    .scheduler
                    .current_entry()
                    .expect("receive_wait called without a running task");
                let msg = Box::new(Message {
                    kind: Kind::BlockedReceiver,
                    payload: Payload::Borrowed(data.as_mut_ptr(), data.len()),
                    status: MessageStatus::Pending,
                    owner: Some(current),
                });
                let msg_ptr = mbox.push_back(msg);
                mbox.n_blocked -= 1;
                let mut entry = k
                    .scheduler
                    .ready
                    .remove(current)
                    .expect("the running task is always on the ready list");
                entry.pending_message = NonNull::new(msg_ptr);
                k.scheduler.waiting.insert_by_deadline(entry);
                Ok(false)
            }
        }
    })?;

    if completed {
        request_switch();
        return Ok(WaitOutcome::Completed);
    }

    request_switch();
    withdraw_if_expired(handle)
}

/// After resuming from a blocked send/receive, check whether a peer
/// completed the rendezvous (`pending_message` cleared) or the
/// deadline fired first (message still queued — withdraw it).
fn withdraw_if_expired(handle: MailboxHandle) -> Result<WaitOutcome, KernelError> {
    Ok(critical_section(|| {
        let k = unsafe { kernel_mut() };
        let current = k
            .scheduler
            .current_entry()
            .expect("the resumed task is always current");
        let pending = unsafe { current.as_ref().pending_message };
        match pending {
            Some(msg_ptr) => {
                let mbox = unsafe { &mut *handle.0.as_ptr() };
                let removed = mbox.remove(msg_ptr.as_ptr());
                debug_assert!(removed.is_some(), "a still-pending message must still be queued");
                let was_sender = matches!(
                    removed.as_deref().map(|m| m.kind),
                    Some(Kind::BlockedSender)
                );
                if was_sender {
                    mbox.n_blocked -= 1;
                } else {
                    mbox.n_blocked += 1;
                }
                unsafe {
                    (*current.as_ptr()).pending_message = None;
                }
                WaitOutcome::DeadlineReached
            }
            None => WaitOutcome::Completed,
        }
    }))
}

/// Asynchronous send: never blocks. Wakes a waiting receiver if one is
/// queued; otherwise buffers a copy, evicting the oldest buffered
/// message if the mailbox is already at capacity. Fails if blocked
/// senders are already queued, since buffering here would mix
/// `Buffered` and `BlockedSender` records in the same mailbox.
pub fn send_no_wait(handle: MailboxHandle, data: &[u8]) -> Result<(), KernelError> {
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        let mbox = unsafe { &mut *handle.0.as_ptr() };
        if data.len() != mbox.data_size {
            return Err(KernelError::Fail);
        }
        if mbox.n_blocked < 0 {
            let mut msg = mbox
                .pop_front_if(Kind::BlockedReceiver)
                .expect("n_blocked < 0 implies a queued receiver");
            unsafe {
                core::ptr::copy_nonoverlapping(data.as_ptr(), msg.payload.as_mut_ptr(), mbox.data_size);
            }
            msg.status = MessageStatus::Completed;
            mbox.n_blocked += 1;
            let owner = msg.owner.expect("a blocked receiver's message always has an owner");
            wake_blocked(k, owner);
            return Ok(());
        }
        if mbox.n_blocked > 0 {
            return Err(KernelError::Fail);
        }
        if mbox.n_messages as usize >= mbox.max_messages {
            if let Some(oldest) = mbox.pop_front_if(Kind::Buffered) {
                drop(oldest);
                mbox.n_messages -= 1;
                kwarn!("mailbox full: evicted the oldest buffered message");
            }
        }
        let owned = alloc::vec::Vec::from(data).into_boxed_slice();
        let msg = Box::new(Message {
            kind: Kind::Buffered,
            payload: Payload::Owned(owned),
            status: MessageStatus::Completed,
            owner: None,
        });
        mbox.push_back(msg);
        mbox.n_messages += 1;
        Ok(())
    })?;
    request_switch();
    Ok(())
}

/// Asynchronous receive: never blocks. Fails if nothing is queued.
pub fn receive_no_wait(handle: MailboxHandle, data: &mut [u8]) -> Result<(), KernelError> {
    critical_section(|| {
        let k = unsafe { kernel_mut() };
        let mbox = unsafe { &mut *handle.0.as_ptr() };
        if data.len() != mbox.data_size {
            return Err(KernelError::Fail);
        }
        match mbox.front_kind() {
            Some(Kind::BlockedSender) => {
                let msg = mbox.pop_front_if(Kind::BlockedSender).unwrap();
                unsafe {
                    core::ptr::copy_nonoverlapping(msg.payload.as_ptr(), data.as_mut_ptr(), mbox.data_size);
                }
                mbox.n_blocked -= 1;
                let owner = msg.owner.expect("a blocked sender's message always has an owner");
                wake_blocked(k, owner);
                Ok(())
            }
            Some(Kind::Buffered) => {
                let msg = mbox.pop_front_if(Kind::Buffered).unwrap();
                unsafe {
                    core::ptr::copy_nonoverlapping(msg.payload.as_ptr(), data.as_mut_ptr(), mbox.data_size);
                }
                mbox.n_messages -= 1;
                Ok(())
            }
            _ => Err(KernelError::Fail),
        }
    })?;
    request_switch();
    Ok(())
}
