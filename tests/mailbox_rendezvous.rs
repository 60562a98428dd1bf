//! Seed scenario 5: a sender blocks first, a shorter-deadline receiver
//! arrives and completes the rendezvous immediately, `n_blocked`
//! returns to zero.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tempus::{kernel, MailboxHandle, WaitOutcome};

static mut MBOX: Option<MailboxHandle> = None;
static SEND_DONE: AtomicBool = AtomicBool::new(false);
static SEND_COMPLETED: AtomicBool = AtomicBool::new(false);
static RECEIVE_DONE: AtomicBool = AtomicBool::new(false);
static RECEIVE_COMPLETED: AtomicBool = AtomicBool::new(false);
static RECEIVED_BYTES: Mutex<[u8; 5]> = Mutex::new([0; 5]);

fn mbox() -> MailboxHandle {
    unsafe { MBOX.expect("set before any task starts") }
}

extern "C" fn sender() -> ! {
    let mut buf = [0u8; 40];
    buf[..5].copy_from_slice(b"hello");
    let outcome = kernel::send_wait(mbox(), &buf);
    SEND_COMPLETED.store(matches!(outcome, Ok(WaitOutcome::Completed)), Ordering::SeqCst);
    SEND_DONE.store(true, Ordering::SeqCst);
    loop {
        let _ = kernel::wait(1_000_000);
    }
}

extern "C" fn receiver() -> ! {
    let mut buf = [0u8; 40];
    let outcome = kernel::receive_wait(mbox(), &mut buf);
    RECEIVE_COMPLETED.store(matches!(outcome, Ok(WaitOutcome::Completed)), Ordering::SeqCst);
    RECEIVED_BYTES.lock().unwrap().copy_from_slice(&buf[..5]);
    RECEIVE_DONE.store(true, Ordering::SeqCst);
    loop {
        let _ = kernel::wait(1_000_000);
    }
}

#[test]
fn receiver_completes_a_blocked_senders_rendezvous() {
    kernel::init_kernel().expect("init_kernel runs exactly once, first");
    unsafe {
        MBOX = Some(kernel::create_mailbox(1, 40).expect("mailbox allocation"));
    }
    // Sender has the longer deadline; receiver (shorter deadline) is
    // scheduled first, blocks with nobody to receive from yet, then
    // the sender's send_wait finds it already queued and completes
    // immediately.
    kernel::create_task(sender, 100).expect("sender admitted");
    kernel::create_task(receiver, 50).expect("receiver admitted");

    std::thread::spawn(|| {
        let _ = kernel::run();
    });

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if SEND_DONE.load(Ordering::SeqCst) && RECEIVE_DONE.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    assert!(SEND_DONE.load(Ordering::SeqCst), "sender never completed");
    assert!(RECEIVE_DONE.load(Ordering::SeqCst), "receiver never completed");
    assert!(SEND_COMPLETED.load(Ordering::SeqCst));
    assert!(RECEIVE_COMPLETED.load(Ordering::SeqCst));
    assert_eq!(&*RECEIVED_BYTES.lock().unwrap(), b"hello");
    assert_eq!(kernel::no_messages(mbox()), 0);
}
