//! # tempus demo firmware
//!
//! Three tasks exercising every core subsystem:
//!
//! | Task | Deadline | Behavior |
//! |------|----------|----------|
//! | `producer` | 50 ticks | samples a counter, sends it non-blocking every period |
//! | `consumer` | 80 ticks | blocks in `receive_wait` for each sample, tracks totals |
//! | `watchdog` | 20 ticks | tightest deadline; sleeps and re-arms its own deadline |
//!
//! `producer` and `consumer` rendezvous through a single mailbox created
//! in `main` before `run()` is called. `watchdog` never touches the
//! mailbox — it demonstrates `wait`/`set_deadline` in isolation, and
//! being the earliest deadline, it preempts the other two on every
//! period.

#![cfg_attr(not(feature = "sim"), no_std)]
#![cfg_attr(feature = "mcu", no_main)]

#[cfg(feature = "mcu")]
use cortex_m_rt::entry;
#[cfg(feature = "mcu")]
use panic_halt as _;

use tempus::{kernel, MailboxHandle, WaitOutcome};

/// Set once in `main`, before any task runs; read-only thereafter.
static mut MAILBOX: Option<MailboxHandle> = None;

fn mailbox() -> MailboxHandle {
    unsafe { MAILBOX.expect("main initializes MAILBOX before creating any task") }
}

extern "C" fn producer() -> ! {
    let mut sample: u32 = 0;
    loop {
        let bytes = sample.to_le_bytes();
        let _ = kernel::send_no_wait(mailbox(), &bytes);
        sample = sample.wrapping_add(1);
        let _ = kernel::wait(5);
    }
}

extern "C" fn consumer() -> ! {
    let mut total: u32 = 0;
    loop {
        let mut bytes = [0u8; 4];
        match kernel::receive_wait(mailbox(), &mut bytes) {
            Ok(WaitOutcome::Completed) => {
                total = total.wrapping_add(u32::from_le_bytes(bytes));
            }
            Ok(WaitOutcome::DeadlineReached) => {
                tempus::kwarn!("consumer missed its deadline waiting for a sample");
            }
            Err(_) => {}
        }
        let _ = total;
    }
}

extern "C" fn watchdog() -> ! {
    loop {
        let _ = kernel::wait(20);
        kernel::set_deadline(kernel::ticks() + 20);
    }
}

#[cfg(feature = "mcu")]
#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().expect("peripherals taken exactly once");
    tempus::port::cortex_m4::set_interrupt_priorities();

    kernel::init_kernel().expect("init_kernel runs exactly once, first");
    unsafe {
        MAILBOX = Some(kernel::create_mailbox(8, 4).expect("mailbox allocation"));
    }
    kernel::create_task(producer, 50).expect("producer admitted in Init mode");
    kernel::create_task(consumer, 80).expect("consumer admitted in Init mode");
    kernel::create_task(watchdog, 20).expect("watchdog admitted in Init mode");

    let mut syst = cp.SYST;
    tempus::port::cortex_m4::configure_systick(&mut syst);

    match kernel::run() {
        Ok(never) => match never {},
        Err(_) => panic!("run() called outside Init mode"),
    }
}

#[cfg(all(feature = "sim", not(feature = "mcu")))]
fn main() {
    kernel::init_kernel().expect("init_kernel runs exactly once, first");
    unsafe {
        MAILBOX = Some(kernel::create_mailbox(8, 4).expect("mailbox allocation"));
    }
    kernel::create_task(producer, 50).expect("producer admitted in Init mode");
    kernel::create_task(consumer, 80).expect("consumer admitted in Init mode");
    kernel::create_task(watchdog, 20).expect("watchdog admitted in Init mode");

    match kernel::run() {
        Ok(never) => match never {},
        Err(e) => eprintln!("run() failed: {e:?}"),
    }
}
