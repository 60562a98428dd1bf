//! Seed scenario 6: a blocked sender's deadline expires before any
//! receiver shows up; it withdraws its queued record and resumes with
//! `DeadlineReached`, leaving the mailbox empty and unblocked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tempus::{kernel, MailboxHandle, WaitOutcome};

static mut MBOX: Option<MailboxHandle> = None;
static SENDER_DONE: AtomicBool = AtomicBool::new(false);
static SENDER_TIMED_OUT: AtomicBool = AtomicBool::new(false);

fn mbox() -> MailboxHandle {
    unsafe { MBOX.expect("set before any task starts") }
}

extern "C" fn lone_sender() -> ! {
    let buf = [0u8; 8];
    // No receiver is ever created, so this can only resolve once its
    // own deadline is hit and it withdraws its queued record.
    let outcome = kernel::send_wait(mbox(), &buf);
    SENDER_TIMED_OUT.store(
        matches!(outcome, Ok(WaitOutcome::DeadlineReached)),
        Ordering::SeqCst,
    );
    SENDER_DONE.store(true, Ordering::SeqCst);
    loop {
        let _ = kernel::wait(1_000_000);
    }
}

#[test]
fn blocked_sender_withdraws_after_its_deadline() {
    kernel::init_kernel().expect("init_kernel runs exactly once, first");
    unsafe {
        MBOX = Some(kernel::create_mailbox(1, 8).expect("mailbox allocation"));
    }
    // A short deadline so the sender's own wait expires quickly;
    // wait() inside send_wait is bounded by the task's deadline, which
    // the scheduler enforces via the timer list on every tick.
    kernel::create_task(lone_sender, 3).expect("sender admitted");

    std::thread::spawn(|| {
        let _ = kernel::run();
    });

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if SENDER_DONE.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    assert!(SENDER_DONE.load(Ordering::SeqCst), "sender never resumed");
    assert!(
        SENDER_TIMED_OUT.load(Ordering::SeqCst),
        "sender resumed but did not see a timeout"
    );
    assert_eq!(kernel::no_messages(mbox()), 0);
}
