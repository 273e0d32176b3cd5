//! LED output handle
//!
//! The control loop owns an [`LedOutput`] and draws into its pixel buffer.
//! `show()` copies the buffer into a [`LedLink`] signal and marks the link
//! busy; the transmit task takes the frame, clocks it out in the selected
//! protocol and clears the busy flag. Only the latest unsent frame is kept.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};

use blinkytile_hal::{OutputDriver, OutputProtocol, Rgb};

/// One frame handed to the transmit task
#[derive(Clone, Copy)]
pub struct LedFrame<const N: usize> {
    pub pixels: [Rgb; N],
    pub brightness: u8,
    pub protocol: OutputProtocol,
}

/// Shared state between the control loop and the transmit task
pub struct LedLink<const N: usize> {
    frame: Signal<CriticalSectionRawMutex, LedFrame<N>>,
    busy: AtomicBool,
}

impl<const N: usize> Default for LedLink<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LedLink<N> {
    pub const fn new() -> Self {
        Self {
            frame: Signal::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// Create the control-loop handle
    pub fn output(&'static self) -> LedOutput<N> {
        LedOutput {
            pixels: [Rgb::default(); N],
            brightness: u8::MAX,
            protocol: OutputProtocol::default(),
            link: self,
        }
    }

    /// Wait for the next frame to transmit
    pub async fn next_frame(&self) -> LedFrame<N> {
        self.frame.wait().await
    }

    /// Mark the last frame as fully transmitted
    pub fn transmit_done(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Pixel buffer and settings owned by the control loop
pub struct LedOutput<const N: usize> {
    pixels: [Rgb; N],
    brightness: u8,
    protocol: OutputProtocol,
    link: &'static LedLink<N>,
}

impl<const N: usize> OutputDriver for LedOutput<N> {
    fn protocol(&self) -> OutputProtocol {
        self.protocol
    }

    fn set_protocol(&mut self, protocol: OutputProtocol) {
        if protocol != self.protocol {
            #[cfg(feature = "defmt")]
            defmt::info!("Output protocol: {}", protocol.name());
        }
        self.protocol = protocol;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn led_count(&self) -> usize {
        N
    }

    fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    fn show(&mut self) {
        self.link.busy.store(true, Ordering::Release);
        self.link.frame.signal(LedFrame {
            pixels: self.pixels,
            brightness: self.brightness,
            protocol: self.protocol,
        });
    }

    fn is_busy(&self) -> bool {
        self.link.is_busy()
    }
}
