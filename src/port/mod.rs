//! Architecture abstraction boundary.
//!
//! Two ports are provided: [`cortex_m4`] (real ARM Cortex-M4 hardware,
//! PendSV/SysTick-driven preemption) and [`sim`] (host-OS simulation,
//! one thread per task). Exactly one is compiled in depending on the
//! `mcu`/`sim` feature; `active` re-exports whichever one is selected
//! so the rest of the kernel never branches on the feature itself.

#[cfg(feature = "mcu")]
pub mod cortex_m4;
#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "mcu")]
pub use cortex_m4 as active;
#[cfg(all(feature = "sim", not(feature = "mcu")))]
pub use sim as active;
