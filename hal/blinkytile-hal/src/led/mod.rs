//! LED output abstractions
//!
//! The output driver owns the physical pixel buffer. Callers write pixels,
//! then call [`OutputDriver::show`] to start a transmission. While a
//! transmission is in flight the driver reports busy and the buffer must not
//! be rewritten.

pub mod encode;

/// Pixel color in (red, green, blue) order
pub type Rgb = smart_leds::RGB8;

/// Wire protocol used to drive the LED string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OutputProtocol {
    /// Single-wire 800kHz protocol
    #[default]
    Ws2812 = 0,
    /// Clocked 7-bit protocol
    Lpd8806 = 1,
    /// Clocked protocol with 5-bit global brightness
    Apa102 = 2,
    /// DMX512 over RS-485
    Dmx = 3,
}

impl OutputProtocol {
    /// Every protocol, in cycling order
    pub const ALL: [OutputProtocol; 4] = [
        OutputProtocol::Ws2812,
        OutputProtocol::Lpd8806,
        OutputProtocol::Apa102,
        OutputProtocol::Dmx,
    ];

    /// Next protocol in the fixed cycle WS2812 → LPD8806 → APA102 → DMX → WS2812
    pub fn next(self) -> Self {
        match self {
            OutputProtocol::Ws2812 => OutputProtocol::Lpd8806,
            OutputProtocol::Lpd8806 => OutputProtocol::Apa102,
            OutputProtocol::Apa102 => OutputProtocol::Dmx,
            OutputProtocol::Dmx => OutputProtocol::Ws2812,
        }
    }

    /// Get the protocol as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a protocol from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OutputProtocol::Ws2812),
            1 => Some(OutputProtocol::Lpd8806),
            2 => Some(OutputProtocol::Apa102),
            3 => Some(OutputProtocol::Dmx),
            _ => None,
        }
    }

    /// Short name for logs and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            OutputProtocol::Ws2812 => "WS2812",
            OutputProtocol::Lpd8806 => "LPD8806",
            OutputProtocol::Apa102 => "APA102",
            OutputProtocol::Dmx => "DMX",
        }
    }
}

/// LED output driver
///
/// Implementations own the pixel buffer and the transmission hardware.
pub trait OutputDriver {
    /// Currently selected wire protocol
    fn protocol(&self) -> OutputProtocol;

    /// Select the wire protocol used by subsequent transmissions
    fn set_protocol(&mut self, protocol: OutputProtocol);

    /// Set global brightness (0-255) applied at transmission time
    fn set_brightness(&mut self, level: u8);

    /// Number of LEDs in the pixel buffer
    fn led_count(&self) -> usize;

    /// Mutable access to the whole pixel buffer
    fn pixels_mut(&mut self) -> &mut [Rgb];

    /// Set a single pixel
    ///
    /// Out-of-range indices are ignored.
    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.pixels_mut().get_mut(index) {
            *pixel = color;
        }
    }

    /// Start transmitting the pixel buffer
    fn show(&mut self);

    /// Check if a transmission is still in flight
    ///
    /// While this returns `true` the pixel buffer belongs to the hardware.
    fn is_busy(&self) -> bool;
}
