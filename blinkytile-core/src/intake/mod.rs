//! Streaming frame intake
//!
//! Two external pixel sources can take over the LEDs:
//!
//! - USB bulk packets, assembled by [`UsbFrameReceiver`] into a
//!   [`FrameMailbox`] and consumed by the controller once per frame
//! - A serial byte stream, decoded in place by [`PixelStreamDecoder`]
//!
//! Either one latches streaming mode until the next reload.

pub mod adapter;
pub mod mailbox;
pub mod serial;
pub mod usb;

pub use adapter::{IntakeStats, StreamIntake, UsbIntake};
pub use mailbox::{FrameConsumer, FrameMailbox, FrameProducer, WirePixel};
pub use serial::{DecodeOutcome, PixelStreamDecoder, SHOW_DELIMITER};
pub use usb::{PacketOutcome, UsbFrameReceiver, PACKET_SIZE, PIXELS_PER_PACKET};
