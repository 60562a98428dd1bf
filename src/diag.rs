//! Kernel trace macros.
//!
//! Three severities, each forwarding a formatted message to the active
//! port's trace sink (`port::active::trace`). On the `sim` port this
//! prints to stderr; on `mcu` it is a no-op unless a board wires a real
//! sink, matching how bare-metal kernels keep logging cheap by default.

#[doc(hidden)]
pub fn dispatch(level: &str, args: core::fmt::Arguments) {
    crate::port::active::trace_with_level(level, args);
}

#[macro_export]
macro_rules! klog {
    ($($arg:tt)*) => {
        $crate::diag::dispatch("INFO", core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {
        $crate::diag::dispatch("WARN", core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {
        $crate::diag::dispatch("ERROR", core::format_args!($($arg)*))
    };
}
