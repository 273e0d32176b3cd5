//! BlinkyTile - LED Controller Firmware
//!
//! Main firmware binary for RP2040-based BlinkyTile boards. Plays stored
//! animations from flash, accepts live frames over USB, and steps aside for
//! the bootloader on a DFU detach.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::Input;
use embassy_rp::peripherals::{PIO0, USB};
use embassy_rp::pio::Pio;
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_rp::spi::{Config as SpiConfig, Spi};
use embassy_rp::uart::{Config as UartConfig, StopBits, UartTx};
use embassy_rp::usb::Driver;
use embassy_rp::watchdog::Watchdog;
use {defmt_rtt as _, panic_probe as _};

use blinkytile_core::intake::UsbFrameReceiver;
use blinkytile_core::pattern::CountUpPattern;
use blinkytile_core::safety::BootloaderHandoff;
use blinkytile_core::{Controller, ControllerIo};
use blinkytile_hal::TableStore;
use blinkytile_hal_rp2040::button::GpioButtons;
use blinkytile_hal_rp2040::flash::{AnimationFlash, Rp2040FlashStorage};
use blinkytile_hal_rp2040::serial::PipeSerial;
use blinkytile_hal_rp2040::system::{enter_rom_bootloader, Rp2040Watchdog, ScratchBootCell};

use crate::channels::{FRAME_MAILBOX, LED_LINK, RELOAD, SERIAL_PIPE};
use crate::config::ConfigPersistence;
use crate::tasks::{LedTransmitter, UsbParts};

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
});

/// SPI clock for LPD8806 and APA102 strips
const SPI_FREQUENCY_HZ: u32 = 2_000_000;

/// DMX512 line rate
const DMX_BAUDRATE: u32 = 250_000;

/// Fallback pattern renders per counter step
const FALLBACK_DIVIDER: u32 = 1024;

// Pin assignments
//
// | GPIO   | Usage                 |
// | :---   | :---                  |
// | GPIO4  | DMX TX (UART1)        |
// | GPIO14 | Button A              |
// | GPIO15 | Button B              |
// | GPIO18 | SPI clock (SPI0)      |
// | GPIO19 | SPI data (SPI0)       |
// | GPIO22 | WS2812 data (PIO0)    |

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("BlinkyTile firmware starting...");

    let mut p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // A DFU detach before the last reset left a token behind
    if BootloaderHandoff::take_request(&mut ScratchBootCell) {
        info!("Boot token found, entering USB bootloader");
        enter_rom_bootloader();
    }

    // Config lives in its own flash partition; the async driver is dropped
    // before the blocking animation reader takes the peripheral
    let config = {
        let storage = Rp2040FlashStorage::new(p.FLASH.reborrow(), p.DMA_CH1.reborrow());
        ConfigPersistence::new(storage).load_or_default().await
    };

    let watchdog = Rp2040Watchdog::start(Watchdog::new(p.WATCHDOG), config.watchdog_timeout_ms);
    info!("Watchdog started ({}ms)", config.watchdog_timeout_ms);

    let store = TableStore::new(AnimationFlash::new(p.FLASH));

    let buttons = GpioButtons::new(
        Input::new(p.PIN_14, GpioButtons::PULL),
        Input::new(p.PIN_15, GpioButtons::PULL),
    );

    let (producer, consumer) = unwrap!(FRAME_MAILBOX.split());

    let controller = Controller::new(
        config,
        ControllerIo {
            output: LED_LINK.output(),
            store,
            buttons,
            serial: PipeSerial::new(&SERIAL_PIPE),
            watchdog,
        },
        consumer,
        &RELOAD,
        CountUpPattern::with_divider(FALLBACK_DIVIDER),
    );
    info!("Controller initialized");

    // USB
    let usb = UsbParts::build(Driver::new(p.USB, Irqs));
    info!("USB device configured");

    // WS2812 on PIO0
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);
    let program = PioWs2812Program::new(&mut common);
    let ws2812 = PioWs2812::new(&mut common, sm0, p.DMA_CH0, p.PIN_22, &program);

    // LPD8806 / APA102 on SPI0
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = SPI_FREQUENCY_HZ;
    let spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH2, spi_config);

    // DMX on UART1, 8N2
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = DMX_BAUDRATE;
    uart_config.stop_bits = StopBits::STOP2;
    let dmx = UartTx::new(p.UART1, p.PIN_4, p.DMA_CH3, uart_config);

    info!("LED outputs initialized");

    // Spawn tasks
    spawner.must_spawn(tasks::usb_task(usb.device));
    spawner.must_spawn(tasks::frame_rx_task(usb.frames, UsbFrameReceiver::new(producer)));
    spawner.must_spawn(tasks::serial_rx_task(usb.serial));
    spawner.must_spawn(tasks::output_task(LedTransmitter { ws2812, spi, dmx }));
    spawner.must_spawn(tasks::control_task(controller));

    info!("All tasks spawned, firmware running");
}

