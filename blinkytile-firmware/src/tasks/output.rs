//! LED transmit task
//!
//! Waits for frames from the control loop and clocks them out in the
//! protocol selected at `show()` time:
//!
//! | Protocol | Peripheral | Notes                          |
//! | :---     | :---       | :---                           |
//! | WS2812   | PIO0 SM0   | brightness applied before send |
//! | LPD8806  | SPI0       | 7-bit channels, zero latch     |
//! | APA102   | SPI0       | 5-bit global brightness field  |
//! | DMX      | UART1      | 250kbaud 8N2, break first      |

use defmt::*;
use embassy_rp::peripherals::{PIO0, SPI0};
use embassy_rp::pio_programs::ws2812::PioWs2812;
use embassy_rp::spi::{Async as SpiAsync, Spi};
use embassy_rp::uart::{Async as UartAsync, UartTx};
use embassy_time::Timer;

use blinkytile_hal::led::encode::{
    apa102_len, dmx_len, encode_apa102, encode_dmx, encode_lpd8806, lpd8806_len, scale,
};
use blinkytile_hal::{OutputProtocol, Rgb};
use blinkytile_hal_rp2040::led::LedFrame;

use crate::channels::{LED_COUNT, LED_LINK};

/// Largest encoded frame over any byte protocol
const ENCODE_BUF_SIZE: usize = max(
    apa102_len(LED_COUNT),
    max(lpd8806_len(LED_COUNT), dmx_len(LED_COUNT)),
);

/// DMX break length in bit times at 250kbaud (88us minimum)
const DMX_BREAK_BITS: u32 = 25;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Output peripherals for every protocol
pub struct LedTransmitter {
    pub ws2812: PioWs2812<'static, PIO0, 0, LED_COUNT>,
    pub spi: Spi<'static, SPI0, SpiAsync>,
    pub dmx: UartTx<'static, UartAsync>,
}

impl LedTransmitter {
    async fn send(&mut self, frame: &LedFrame<LED_COUNT>, buf: &mut [u8]) {
        match frame.protocol {
            OutputProtocol::Ws2812 => {
                let mut scaled = [Rgb::default(); LED_COUNT];
                for (out, pixel) in scaled.iter_mut().zip(frame.pixels.iter()) {
                    *out = scale(*pixel, frame.brightness);
                }
                self.ws2812.write(&scaled).await;
            }
            OutputProtocol::Lpd8806 => {
                if let Ok(len) = encode_lpd8806(&frame.pixels, frame.brightness, buf) {
                    if let Err(e) = self.spi.write(&buf[..len]).await {
                        warn!("LPD8806 write failed: {:?}", e);
                    }
                }
            }
            OutputProtocol::Apa102 => {
                if let Ok(len) = encode_apa102(&frame.pixels, frame.brightness, buf) {
                    if let Err(e) = self.spi.write(&buf[..len]).await {
                        warn!("APA102 write failed: {:?}", e);
                    }
                }
            }
            OutputProtocol::Dmx => {
                if let Ok(len) = encode_dmx(&frame.pixels, frame.brightness, buf) {
                    self.dmx.send_break(DMX_BREAK_BITS).await;
                    if let Err(e) = self.dmx.write(&buf[..len]).await {
                        warn!("DMX write failed: {:?}", e);
                    }
                }
            }
        }
    }
}

/// Output task - transmits each frame handed over by the control loop
#[embassy_executor::task]
pub async fn output_task(mut transmitter: LedTransmitter) -> ! {
    info!("Output task started");

    let mut buf = [0u8; ENCODE_BUF_SIZE];
    loop {
        let frame = LED_LINK.next_frame().await;
        transmitter.send(&frame, &mut buf).await;
        if frame.protocol == OutputProtocol::Ws2812 {
            // WS2812 latch
            Timer::after_micros(60).await;
        }
        LED_LINK.transmit_done();
    }
}
