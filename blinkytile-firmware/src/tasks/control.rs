//! Control loop task
//!
//! Ticks the controller as fast as the executor allows, yielding between
//! ticks so USB and LED transmission keep running. A DFU detach request ends
//! the loop and hands the controller to the bootloader handoff.

use defmt::*;
use portable_atomic::Ordering;

use blinkytile_core::pattern::CountUpPattern;
use blinkytile_core::Controller;
use blinkytile_hal::Clock;
use blinkytile_hal_rp2040::button::GpioButtons;
use blinkytile_hal_rp2040::flash::Rp2040AnimationStore;
use blinkytile_hal_rp2040::led::LedOutput;
use blinkytile_hal_rp2040::serial::PipeSerial;
use blinkytile_hal_rp2040::system::{EmbassyClock, Rp2040System, Rp2040Watchdog, ScratchBootCell};

use crate::channels::{BOOTLOADER_REQUEST, LED_COUNT};

/// Controller wired to the RP2040 peripherals
pub type FirmwareController = Controller<
    'static,
    LED_COUNT,
    LedOutput<LED_COUNT>,
    Rp2040AnimationStore<'static>,
    GpioButtons<'static>,
    PipeSerial,
    Rp2040Watchdog,
    CountUpPattern,
>;

/// Control task - owns the controller until the bootloader takes over
#[embassy_executor::task]
pub async fn control_task(mut controller: FirmwareController) -> ! {
    info!("Control task started");

    let clock = EmbassyClock;
    let mut last_mode = controller.mode();

    while !BOOTLOADER_REQUEST.load(Ordering::Acquire) {
        let report = controller.tick(clock.now_ms());

        if report.mode != last_mode {
            info!("Mode: {:?} -> {:?}", last_mode, report.mode);
            last_mode = report.mode;
        }
        if let Some(action) = report.button {
            debug!("Button: {:?}", action);
        }

        embassy_futures::yield_now().await;
    }

    let stats = controller.intake_stats();
    info!(
        "Entering bootloader (usb frames {}, dropped {}, serial bytes {})",
        stats.usb_frames, stats.usb_dropped, stats.serial_bytes
    );
    controller.enter_bootloader(&mut ScratchBootCell, &clock, &mut Rp2040System)
}

