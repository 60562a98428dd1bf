//! Compile-time constants governing kernel behavior.
//!
//! All limits are fixed at compile time. Per-target values are split by
//! the `mcu`/`sim` features since stack and clock budgets differ wildly
//! between a bare Cortex-M4 and a host simulation process.

/// Per-task stack size in bytes.
///
/// On `mcu` this must cover the deepest call chain plus the hardware
/// exception frame (32 bytes) and the software-saved R4-R11 context
/// (32 bytes). On `sim` each task is a real OS thread, so this only
/// bounds the host thread's stack.
#[cfg(feature = "mcu")]
pub const STACK_SIZE: usize = 1024;
#[cfg(not(feature = "mcu"))]
pub const STACK_SIZE: usize = 64 * 1024;

/// Number of general-purpose registers saved/restored per context switch
/// on the Cortex-M4 port (R4-R11).
pub const CORTEX_M4_CONTEXT_WORDS: usize = 8;

/// SysTick frequency in Hz on the `mcu` target.
pub const TICK_HZ: u32 = 1000;

/// Nominal system clock, used to compute the SysTick reload value
/// (default matches an STM32F4-class part running from its 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Nominal tick period for the `sim` target's background tick thread.
#[cfg(feature = "sim")]
pub const SIM_TICK_PERIOD_MS: u64 = 20;

/// Deadline assigned to the idle task: effectively "never".
pub const IDLE_DEADLINE: u64 = u64::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_deadline_is_maximal() {
        assert_eq!(IDLE_DEADLINE, u64::MAX);
    }
}
