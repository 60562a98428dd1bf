//! Reassessment: the EDF scheduling core.
//!
//! Grounded on the original kernel's `schedulingUpdate()` (move expired
//! timer-list then waiting-list entries onto the ready list, then set
//! the running task to the ready-list head) and `idleTask()`.

use core::ptr::NonNull;

use crate::list::TaskList;
use crate::task::{TaskId, TaskListEntry};

/// The idle task's body: a tight loop that yields the CPU back to the
/// port's wait-for-interrupt/thread-yield primitive. It is always on
/// the ready list with the maximal deadline, so it only ever runs when
/// every other task is blocked.
///
/// On `mcu`, `wfi()` sleeps until the next interrupt, including
/// `SysTick`; hardware preemption does the rest. On `sim` there is no
/// hardware preemption (see `port::sim`'s module doc), so idle also
/// polls `kernel::request_switch` on every iteration, which is what
/// actually notices a tick-thread-driven wakeup and hands the OS
/// thread off to the newly-ready task.
pub extern "C" fn idle_task_body() -> ! {
    loop {
        #[cfg(feature = "mcu")]
        cortex_m::asm::wfi();
        #[cfg(all(feature = "sim", not(feature = "mcu")))]
        {
            std::thread::yield_now();
            crate::kernel::request_switch();
        }
    }
}

/// Owns the three task lists and the current-task pointer. One
/// instance exists per kernel (see `kernel::KERNEL`).
pub struct Scheduler {
    pub ready: TaskList,
    pub waiting: TaskList,
    pub timer: TaskList,
    pub current: Option<NonNull<TaskListEntry>>,
    pub ticks: u64,
    pub needs_reschedule: bool,
    next_id: TaskId,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            ready: TaskList::create(),
            waiting: TaskList::create(),
            timer: TaskList::create(),
            current: None,
            ticks: 0,
            needs_reschedule: false,
            next_id: 0,
        }
    }

    pub fn alloc_task_id(&mut self) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Move expired timer/waiting entries to the ready list, then set
    /// `current` to the new ready-list head. Called on every tick and
    /// after every state-changing kernel call.
    pub fn reassess(&mut self) {
        let ticks = self.ticks;
        let ready = &mut self.ready;
        self.timer.drain_expired_by(
            ticks,
            |e| e.wake_tick.expect("timer entries always carry a wake_tick"),
            |mut e| {
                e.wake_tick = None;
                ready.insert_by_deadline(e);
            },
        );
        self.waiting
            .drain_expired_by(ticks, |e| e.deadline, |e| ready.insert_by_deadline(e));

        let new_head = self.ready.peek_ptr();
        if new_head != self.current {
            self.needs_reschedule = true;
        }
        self.current = new_head;
    }

    /// Increment the tick counter and reassess. Invoked from the tick
    /// source (`SysTick` on `mcu`, the background tick thread on `sim`).
    pub fn tick(&mut self) {
        self.ticks += 1;
        self.reassess();
    }

    pub fn current_entry(&self) -> Option<NonNull<TaskListEntry>> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskListEntry;

    #[test]
    fn idle_task_stays_head_until_preempted() {
        let mut s = Scheduler::new();
        let id = s.alloc_task_id();
        s.ready
            .insert_by_deadline(TaskListEntry::idle(id, idle_task_body).unwrap());
        s.reassess();
        assert!(s.current.is_some());
        assert_eq!(s.ready.len(), 1);
    }

    #[test]
    fn timer_expiry_moves_entry_to_ready() {
        let mut s = Scheduler::new();
        let idle_id = s.alloc_task_id();
        s.ready
            .insert_by_deadline(TaskListEntry::idle(idle_id, idle_task_body).unwrap());
        let sleeper_id = s.alloc_task_id();
        let mut sleeping = TaskListEntry::new(sleeper_id, idle_task_body, 5);
        sleeping.wake_tick = Some(3);
        s.timer.insert_by_wake(sleeping);

        s.ticks = 2;
        s.reassess();
        assert_eq!(s.timer.len(), 1);
        assert_eq!(s.ready.len(), 1);

        s.ticks = 3;
        s.reassess();
        assert_eq!(s.timer.len(), 0);
        assert_eq!(s.ready.len(), 2);
    }

    #[test]
    fn running_head_invariant() {
        let mut s = Scheduler::new();
        let a = s.alloc_task_id();
        s.ready
            .insert_by_deadline(TaskListEntry::idle(a, idle_task_body).unwrap());
        let b = s.alloc_task_id();
        s.ready.insert_by_deadline(TaskListEntry::new(b, idle_task_body, 10));
        s.reassess();
        assert_eq!(s.current, s.ready.peek_ptr());
    }
}
