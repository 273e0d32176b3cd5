//! Watchdog, boot cell, clock and system control

use embassy_rp::pac;
use embassy_time::{Duration, Instant};

use blinkytile_hal::{BootTokenCell, Clock, SystemControl, Watchdog};

/// Watchdog scratch register holding the boot token across reset
///
/// Scratch 4-7 belong to the boot ROM's reboot-to-address path; 0-3 are
/// free for the application and survive a watchdog reset.
pub const BOOT_TOKEN_SCRATCH: usize = 0;

/// Hardware watchdog
pub struct Rp2040Watchdog {
    inner: embassy_rp::watchdog::Watchdog,
}

impl Rp2040Watchdog {
    /// Start the watchdog with the given timeout
    pub fn start(mut inner: embassy_rp::watchdog::Watchdog, timeout_ms: u32) -> Self {
        inner.pause_on_debug(true);
        inner.start(Duration::from_millis(u64::from(timeout_ms)));
        Self { inner }
    }
}

impl Watchdog for Rp2040Watchdog {
    fn feed(&mut self) {
        self.inner.feed();
    }
}

/// Watchdog scratch register checked by the firmware at startup
#[derive(Default)]
pub struct ScratchBootCell;

impl BootTokenCell for ScratchBootCell {
    fn write_token(&mut self, token: u32) {
        pac::WATCHDOG.scratch(BOOT_TOKEN_SCRATCH).write_value(token);
    }

    fn take_token(&mut self) -> Option<u32> {
        let scratch = pac::WATCHDOG.scratch(BOOT_TOKEN_SCRATCH);
        let token = scratch.read();
        scratch.write_value(0);
        (token != 0).then_some(token)
    }
}

/// Reset into the boot ROM's USB bootloader (UF2 drive and PICOBOOT)
pub fn enter_rom_bootloader() {
    // No activity LED, both USB interfaces enabled
    embassy_rp::rom_data::reset_to_usb_boot(0, 0);
}

/// Milliseconds since boot from the embassy time driver
#[derive(Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// Interrupt, USB and halt control
#[derive(Default)]
pub struct Rp2040System;

impl SystemControl for Rp2040System {
    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    fn detach_usb(&mut self) {
        // Dropping the D+ pull-up makes the host see a disconnect
        pac::USBCTRL_REGS.sie_ctrl().modify(|w| w.set_pullup_en(false));
    }

    fn halt(&mut self) -> ! {
        loop {
            cortex_m::asm::nop();
        }
    }
}
