//! Serial pixel stream decoder
//!
//! Data-mode stream as sent by BlinkyTape-style hosts: every byte below 255 is
//! a channel value, filled in red, green, blue order into consecutive LEDs.
//! A 255 byte ends the frame: the pixels are shown and the write cursor
//! returns to LED 0.

use blinkytile_hal::{OutputDriver, Rgb};

/// Frame delimiter byte
pub const SHOW_DELIMITER: u8 = 255;

/// What a single byte did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeOutcome {
    /// Channel value buffered or pixel written
    Stored,
    /// Delimiter; frame handed to the output
    Shown,
    /// Delimiter while the output was busy; frame not shown
    ShowSkipped,
}

/// Byte-at-a-time decoder for the serial pixel stream
#[derive(Debug, Default, Clone)]
pub struct PixelStreamDecoder {
    /// LED the next complete pixel lands on
    led: usize,
    /// Channels received for the current pixel
    channels: [u8; 3],
    filled: usize,
}

impl PixelStreamDecoder {
    pub const fn new() -> Self {
        Self {
            led: 0,
            channels: [0; 3],
            filled: 0,
        }
    }

    /// LED index the next pixel will be written to
    pub fn cursor(&self) -> usize {
        self.led
    }

    /// Feed one byte from the serial port
    pub fn push<O: OutputDriver>(&mut self, byte: u8, output: &mut O) -> DecodeOutcome {
        if byte == SHOW_DELIMITER {
            let busy = output.is_busy();
            if !busy {
                output.show();
            }
            self.led = 0;
            self.filled = 0;
            return if busy {
                DecodeOutcome::ShowSkipped
            } else {
                DecodeOutcome::Shown
            };
        }

        self.channels[self.filled] = byte;
        self.filled += 1;
        if self.filled == self.channels.len() {
            let [r, g, b] = self.channels;
            // Past the end of the strip until the next delimiter
            output.set_pixel(self.led, Rgb::new(r, g, b));
            self.led = self.led.saturating_add(1);
            self.filled = 0;
        }
        DecodeOutcome::Stored
    }
}
