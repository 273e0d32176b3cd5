//! Bootloader handoff
//!
//! Sequence, in order:
//!
//! 1. Write [`BOOT_TOKEN`] to the cell the bootloader reads after reset
//! 2. Spin for the grace window so the host sees the reply to its detach
//!    request, feeding the watchdog on every iteration
//! 3. Disable interrupts
//! 4. Detach from USB
//! 5. Halt and let the watchdog reset the board
//!
//! Steps 1-2 return and steps 3-5 diverge, so they are exposed separately.
//! After the reset, [`BootloaderHandoff::take_request`] finds the token and
//! the firmware enters the bootloader before starting the application.

use blinkytile_hal::{BootTokenCell, Clock, SystemControl, Watchdog};

/// Value the bootloader looks for to stay in update mode after reset
pub const BOOT_TOKEN: u32 = 0x7462_4346;

/// Default grace window between token write and USB detach
pub const HANDOFF_GRACE_MS: u32 = 10;

/// Transfers control to the USB bootloader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootloaderHandoff {
    grace_ms: u32,
}

impl Default for BootloaderHandoff {
    fn default() -> Self {
        Self::new(HANDOFF_GRACE_MS)
    }
}

impl BootloaderHandoff {
    pub const fn new(grace_ms: u32) -> Self {
        Self { grace_ms }
    }

    pub fn grace_ms(&self) -> u32 {
        self.grace_ms
    }

    /// Write the boot token and wait out the grace window
    ///
    /// Returns the number of watchdog feeds made while waiting.
    pub fn prepare<W, C, K>(&self, watchdog: &mut W, cell: &mut C, clock: &K) -> u32
    where
        W: Watchdog,
        C: BootTokenCell,
        K: Clock,
    {
        cell.write_token(BOOT_TOKEN);

        let deadline = clock.now_ms() + u64::from(self.grace_ms);
        let mut feeds = 0u32;
        while clock.now_ms() < deadline {
            watchdog.feed();
            feeds = feeds.wrapping_add(1);
        }
        feeds
    }

    /// Check for a handoff left by the previous boot
    ///
    /// Clears the cell, so a request is honoured once. Any value other than
    /// [`BOOT_TOKEN`] is ignored.
    pub fn take_request<C: BootTokenCell>(cell: &mut C) -> bool {
        cell.take_token() == Some(BOOT_TOKEN)
    }

    /// Disable interrupts, detach USB and halt
    pub fn finish<S: SystemControl>(&self, system: &mut S) -> ! {
        system.disable_interrupts();
        system.detach_usb();
        system.halt()
    }

    /// Run the full handoff. Does not return.
    pub fn run<W, C, K, S>(&self, watchdog: &mut W, cell: &mut C, clock: &K, system: &mut S) -> !
    where
        W: Watchdog,
        C: BootTokenCell,
        K: Clock,
        S: SystemControl,
    {
        #[cfg(feature = "defmt")]
        defmt::info!("Entering bootloader, grace {}ms", self.grace_ms);

        self.prepare(watchdog, cell, clock);
        self.finish(system)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::{MockClock, MockSystem, MockWatchdog, SystemStep};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_prepare_writes_token_before_waiting() {
        let handoff = BootloaderHandoff::default();
        let mut watchdog = MockWatchdog::default();
        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(1_000, 1);

        handoff.prepare(&mut watchdog, &mut cell, &clock);

        assert_eq!(cell.token, Some(BOOT_TOKEN));
        assert_eq!(cell.feeds_at_token, Some(0));
    }

    #[test]
    fn test_grace_window_is_fed_throughout() {
        let handoff = BootloaderHandoff::new(10);
        let mut watchdog = MockWatchdog::default();
        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(1_000, 1);

        let feeds = handoff.prepare(&mut watchdog, &mut cell, &clock);

        // Deadline read at 1000, loop checks 1001..=1010
        assert_eq!(feeds, 9);
        assert_eq!(watchdog.feeds(), 9);
        assert!(clock.peek() >= 1_010);
    }

    #[test]
    fn test_zero_grace_does_not_spin() {
        let handoff = BootloaderHandoff::new(0);
        let mut watchdog = MockWatchdog::default();
        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(0, 1);

        assert_eq!(handoff.prepare(&mut watchdog, &mut cell, &clock), 0);
        assert_eq!(cell.token, Some(BOOT_TOKEN));
    }

    #[test]
    fn test_token_is_read_back_once_after_reset() {
        let mut watchdog = MockWatchdog::default();
        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(0, 5);
        BootloaderHandoff::new(10).prepare(&mut watchdog, &mut cell, &clock);

        assert!(BootloaderHandoff::take_request(&mut cell));
        assert!(!BootloaderHandoff::take_request(&mut cell));
    }

    #[test]
    fn test_foreign_token_is_not_a_request() {
        let mut cell = MockWatchdog::default();
        cell.write_token(0xDEAD_BEEF);
        assert!(!BootloaderHandoff::take_request(&mut cell));
        assert_eq!(cell.token, None);
    }

    #[test]
    #[should_panic(expected = "halted")]
    fn test_finish_diverges() {
        let mut system = MockSystem::default();
        BootloaderHandoff::default().finish(&mut system);
    }

    #[test]
    fn test_run_order() {
        let handoff = BootloaderHandoff::default();
        let mut watchdog = MockWatchdog::default();
        let mut cell = MockWatchdog::default();
        let clock = MockClock::new(0, 1);
        let mut system = MockSystem::default();

        let result = catch_unwind(AssertUnwindSafe(|| {
            handoff.run(&mut watchdog, &mut cell, &clock, &mut system)
        }));

        assert!(result.is_err());
        assert_eq!(cell.token, Some(BOOT_TOKEN));
        assert!(watchdog.feeds() > 0);
        assert!(clock.peek() >= u64::from(HANDOFF_GRACE_MS));
        assert_eq!(
            system.steps,
            [SystemStep::DisableInterrupts, SystemStep::DetachUsb, SystemStep::Halt]
        );
    }
}
