//! Streaming intake
//!
//! Moves externally supplied pixels onto the LEDs. Called once per tick by
//! the controller, after autonomous rendering.

use blinkytile_hal::{OutputDriver, Rgb, SerialPort, Watchdog};

use super::mailbox::{FrameConsumer, WirePixel};
use super::serial::{DecodeOutcome, PixelStreamDecoder};

/// What the USB path did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbIntake {
    /// No finalized frame waiting
    #[default]
    Idle,
    /// Frame copied to the output and shown
    Shown,
    /// Frame discarded because the output was still transmitting
    Dropped,
}

impl UsbIntake {
    /// A finalized frame was observed, shown or not
    pub fn saw_frame(&self) -> bool {
        !matches!(self, UsbIntake::Idle)
    }
}

/// Running intake counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntakeStats {
    pub usb_frames: u32,
    pub usb_dropped: u32,
    pub serial_bytes: u32,
    pub serial_skipped_shows: u32,
}

/// USB mailbox consumer plus serial decoder
pub struct StreamIntake<'a, const N: usize> {
    frames: FrameConsumer<'a, N>,
    decoder: PixelStreamDecoder,
    stats: IntakeStats,
}

impl<'a, const N: usize> StreamIntake<'a, N> {
    pub fn new(frames: FrameConsumer<'a, N>) -> Self {
        Self {
            frames,
            decoder: PixelStreamDecoder::new(),
            stats: IntakeStats::default(),
        }
    }

    pub fn stats(&self) -> IntakeStats {
        self.stats
    }

    /// Take a finalized USB frame, if any, and show it
    ///
    /// Stored `[b, g, r]` pixels are written to the output as RGB. A busy
    /// output drops the frame; it is not retried.
    pub fn service_usb<O: OutputDriver>(&mut self, output: &mut O) -> UsbIntake {
        let result = self.frames.take(|frame| {
            if output.is_busy() {
                return UsbIntake::Dropped;
            }
            for (pixel, &wire) in output.pixels_mut().iter_mut().zip(frame.iter()) {
                *pixel = wire_to_rgb(wire);
            }
            output.show();
            UsbIntake::Shown
        });

        let outcome = result.unwrap_or_default();
        match outcome {
            UsbIntake::Idle => {}
            UsbIntake::Shown => {
                self.stats.usb_frames = self.stats.usb_frames.wrapping_add(1);
            }
            UsbIntake::Dropped => {
                self.stats.usb_dropped = self.stats.usb_dropped.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::debug!("USB frame dropped, output busy");
            }
        }
        outcome
    }

    /// Drain the serial port into the pixel stream decoder
    ///
    /// Runs until the port reports nothing pending, feeding the watchdog
    /// after every byte. Returns the number of bytes consumed.
    pub fn service_serial<S, O, W>(
        &mut self,
        serial: &mut S,
        output: &mut O,
        watchdog: &mut W,
    ) -> usize
    where
        S: SerialPort,
        O: OutputDriver,
        W: Watchdog,
    {
        let mut consumed = 0usize;
        while serial.bytes_available() {
            if let Some(byte) = serial.read_byte() {
                if self.decoder.push(byte, output) == DecodeOutcome::ShowSkipped {
                    self.stats.serial_skipped_shows =
                        self.stats.serial_skipped_shows.wrapping_add(1);
                }
                consumed += 1;
            }
            watchdog.feed();
        }
        self.stats.serial_bytes = self.stats.serial_bytes.wrapping_add(consumed as u32);
        consumed
    }
}

/// Convert a stored mailbox pixel to RGB
pub fn wire_to_rgb([b, g, r]: WirePixel) -> Rgb {
    Rgb::new(r, g, b)
}
