//! ARM Cortex-M4 port: PendSV/SysTick-driven preemption.
//!
//! Grounded on the teacher's `arch/cortex_m4.rs` almost unchanged: the
//! split MSP/PSP stack model, the PendSV save/restore sequence, and the
//! SysTick handler are generic to any preemptive kernel built on this
//! chip family. Only the scheduling decision behind `do_context_switch`
//! changes (EDF reassessment instead of game-theory payoff selection).
//!
//! ## Context switch mechanism
//!
//! - **MSP** (Main Stack Pointer): used by the kernel and interrupt handlers.
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode.
//!
//! On exception entry the hardware automatically stacks R0-R3, R12, LR,
//! PC, and xPSR onto the process stack. PendSV manually saves/restores
//! R4-R11, completing the full context save/restore.

use core::arch::asm;
use core::fmt;

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{CORTEX_M4_CONTEXT_WORDS, SYSTEM_CLOCK_HZ, TICK_HZ};

// ---------------------------------------------------------------------------
// Critical sections
// ---------------------------------------------------------------------------

pub fn isr_off() {
    unsafe { cortex_m::interrupt::disable() };
}

pub fn isr_on() {
    unsafe { cortex_m::interrupt::enable() };
}

// ---------------------------------------------------------------------------
// Stack frame initialization
// ---------------------------------------------------------------------------

/// Lay out the initial hardware + software stack frame for a fresh
/// task so the first PendSV restore jumps straight into `entry`.
///
/// Layout from low to high address: 8 software-saved registers
/// (R4-R11, all zero), then the hardware exception frame
/// (R0-R3, R12, LR, PC = `entry`, xPSR = Thumb bit set).
///
/// # Safety
/// `stack` must be at least large enough to hold both frames and must
/// not be aliased elsewhere.
pub unsafe fn init_stack(stack: &mut [u8], entry: extern "C" fn() -> !) -> *mut u32 {
    let base = stack.as_mut_ptr() as *mut u32;
    let word_len = stack.len() / core::mem::size_of::<u32>();
    let top = base.add(word_len);

    // Hardware frame: xPSR, PC, LR, R12, R3, R2, R1, R0 (high to low).
    let mut sp = top;
    sp = sp.sub(1);
    sp.write(0x0100_0000); // xPSR: Thumb bit set
    sp = sp.sub(1);
    sp.write(entry as usize as u32); // PC
    sp = sp.sub(1);
    sp.write(task_exit as usize as u32); // LR: return address on fall-through
    sp = sp.sub(1);
    sp.write(0); // R12
    for _ in 0..3 {
        sp = sp.sub(1);
        sp.write(0); // R3, R2, R1
    }
    sp = sp.sub(1);
    sp.write(0); // R0

    // Software frame: R11..R4, all zero.
    for _ in 0..CORTEX_M4_CONTEXT_WORDS {
        sp = sp.sub(1);
        sp.write(0);
    }

    sp
}

/// Reached only if a task's `extern "C" fn() -> !` body somehow returns,
/// which it must not; terminates the task instead of running off the
/// end of its stack.
#[no_mangle]
extern "C" fn task_exit() -> ! {
    crate::kernel::terminate()
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// PendSV trigger & interrupt priorities
// ---------------------------------------------------------------------------

#[inline]
pub fn trigger_pendsv() {
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

pub fn set_interrupt_priorities() {
    unsafe {
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = val | (0xFF << 16) | (0xFF << 24);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch to PSP and branch into the first task. Never returns.
///
/// # Safety
/// Must be called exactly once, with a valid stack pointer produced by
/// `init_stack`.
pub unsafe fn start_first(sp: *mut u32) -> ! {
    asm!(
        "adds r0, #32",
        "msr psp, r0",
        "movs r0, #2",
        "msr control, r0",
        "isb",
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",
        "pop {{r5}}",
        "pop {{r6}}",
        "cpsie i",
        "bx r5",
        in("r0") sp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// # Safety
/// Naked function called directly by the NVIC; must follow the exact
/// Cortex-M4 exception entry/exit convention.
#[no_mangle]
#[naked]
pub unsafe extern "C" fn PendSV() {
    asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",
        "bl {do_schedule}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save_context = sym save_current_context,
        do_schedule = sym do_context_switch,
        options(noreturn)
    );
}

/// Save the outgoing task's stack pointer. Called from PendSV.
#[no_mangle]
unsafe extern "C" fn save_current_context(psp: *mut u32) {
    let kernel = crate::kernel::kernel_mut();
    if let Some(mut current) = kernel.scheduler.current_entry() {
        current.as_mut().task.stack_pointer = psp;
    }
}

/// Select the next task and return its saved stack pointer. Called
/// from PendSV after `save_current_context`.
///
/// Reassessment is deliberately performed here, inside the ISR, rather
/// than by the code that requested the switch: `save_current_context`
/// must run first against the *still-current* task before reassessment
/// moves `scheduler.current` on to whichever task now has the earliest
/// deadline. Running both halves back-to-back inside one exception
/// also makes the pair atomic with respect to `SysTick`.
#[no_mangle]
unsafe extern "C" fn do_context_switch() -> *mut u32 {
    let kernel = crate::kernel::kernel_mut();
    kernel.scheduler.reassess();
    kernel.scheduler.needs_reschedule = false;
    let current = kernel
        .scheduler
        .current_entry()
        .expect("the ready list is never empty once running");
    current.as_ref().task.stack_pointer
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — the kernel's tick source on `mcu`.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let kernel = crate::kernel::kernel_mut();
    kernel.scheduler.tick();
    if kernel.scheduler.needs_reschedule {
        trigger_pendsv();
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// No-op unless a concrete board wires a real sink (e.g. a UART); kept
/// as the hook a board bring-up would point at `itm`/`defmt-rtt`.
pub fn trace_with_level(_level: &str, _args: fmt::Arguments) {}
