//! Watchdog, clock and low-level system control
//!
//! These are the primitives the bootloader handoff is built from.

/// Hardware watchdog
///
/// Forces a reset unless fed within its timeout.
pub trait Watchdog {
    /// Restart the watchdog countdown
    fn feed(&mut self);
}

/// Memory cell that survives a watchdog reset
///
/// Read back on the next boot to decide whether to enter firmware-update
/// mode instead of starting the application.
pub trait BootTokenCell {
    /// Store the token
    fn write_token(&mut self, token: u32);

    /// Read and clear the stored token, if any
    fn take_token(&mut self) -> Option<u32>;
}

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;
}

/// Irreversible system actions used by the bootloader handoff
pub trait SystemControl {
    /// Mask all interrupts
    fn disable_interrupts(&mut self);

    /// Drop off the USB bus so the host sees a detach
    fn detach_usb(&mut self);

    /// Stop forever, leaving the watchdog to reset the chip
    fn halt(&mut self) -> !;
}
