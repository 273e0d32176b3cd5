//! Watchdog supervision and bootloader handoff
//!
//! The hardware watchdog resets the board if the control loop stops feeding
//! it. The handoff is the one deliberate way out of the loop.

pub mod handoff;
pub mod watchdog;

pub use handoff::{BootloaderHandoff, BOOT_TOKEN, HANDOFF_GRACE_MS};
pub use watchdog::WatchdogSupervisor;
