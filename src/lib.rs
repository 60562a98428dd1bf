//! # tempus
//!
//! A small preemptive real-time kernel: earliest-deadline-first scheduling,
//! a tick-driven timer service, and mailbox-based inter-task messaging.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init_kernel() · create_task() · run() · terminate()   │
//! │   wait() · set_deadline() · mailbox ops                 │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Mailboxes        │  Sync / diag      │
//! │  scheduler.rs│   mailbox.rs       │  sync.rs diag.rs  │
//! │  ─ tick()    │   ─ send_wait()    │  ─ critical_section│
//! │  ─ reassess()│   ─ receive_wait() │  ─ klog!/kwarn!   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │      Task model (task.rs) · Ordered lists (list.rs)     │
//! │    TaskDescriptor · TaskListEntry · TaskList            │
//! ├────────────────────────────────────────────────────────┤
//! │     Port layer (port/) · Instrumented allocator          │
//! │  port::cortex_m4 (PendSV/SysTick)  port::sim (threads)   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Three task lists are maintained at all times: the ready list (sorted by
//! deadline, ascending), the waiting list (tasks blocked in a mailbox
//! rendezvous, sorted by deadline), and the timer list (tasks sleeping for
//! a number of ticks, sorted by wake tick). On every tick, and after every
//! state-changing kernel call, the scheduler moves expired timer/waiting
//! entries onto the ready list and sets the running task to the ready
//! list's head. The running task is therefore always the one with the
//! earliest deadline among all runnable tasks.
//!
//! ## Memory model
//!
//! Task stacks, task descriptors, and mailbox message records are
//! allocated through [`allocator::InstrumentedAllocator`], a global
//! allocator wrapper that can be configured to fail deterministically
//! every Nth call — used by tests to exercise allocation-failure paths
//! that would otherwise be nearly impossible to trigger reliably.

#![cfg_attr(not(feature = "sim"), no_std)]

extern crate alloc;

pub mod allocator;
pub mod config;
pub mod diag;
pub mod error;
pub mod kernel;
pub mod list;
pub mod mailbox;
pub mod port;
pub mod scheduler;
pub mod sync;
pub mod task;

pub use error::{KernelError, WaitOutcome};
pub use mailbox::MailboxHandle;
pub use task::TaskId;
