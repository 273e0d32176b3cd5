//! USB frame packet assembly
//!
//! Frames arrive as 64-byte bulk packets. The first byte is a control byte:
//!
//! ```text
//! bit  7 6 | 5     | 4 3 2 1 0
//!      type | final | packet index
//! ```
//!
//! Framebuffer packets (type 0) carry 21 pixels of 3 bytes each, placed at
//! `index * 21`. The packet with the final bit set publishes the frame.
//! Pixel bytes are written to the mailbox unchanged.

use super::mailbox::{FrameProducer, WirePixel};

/// Bulk packet size
pub const PACKET_SIZE: usize = 64;

/// Pixels carried by one framebuffer packet
pub const PIXELS_PER_PACKET: usize = 21;

const TYPE_MASK: u8 = 0xC0;
const TYPE_FRAMEBUFFER: u8 = 0x00;
const FINAL_BIT: u8 = 0x20;
const INDEX_MASK: u8 = 0x1F;

/// Result of handling one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketOutcome {
    /// Pixels written into the frame under construction
    Partial,
    /// Frame published; `replaced` if an untaken frame was overwritten
    Published { replaced: bool },
    /// Not a framebuffer packet, or empty
    Ignored,
}

/// Assembles framebuffer packets into the frame mailbox
pub struct UsbFrameReceiver<'a, const N: usize> {
    producer: FrameProducer<'a, N>,
    ignored: u32,
}

impl<'a, const N: usize> UsbFrameReceiver<'a, N> {
    pub fn new(producer: FrameProducer<'a, N>) -> Self {
        Self {
            producer,
            ignored: 0,
        }
    }

    /// Packets dropped because they were not framebuffer data
    pub fn ignored(&self) -> u32 {
        self.ignored
    }

    pub fn handle_packet(&mut self, packet: &[u8]) -> PacketOutcome {
        let Some((&control, payload)) = packet.split_first() else {
            self.ignored = self.ignored.wrapping_add(1);
            return PacketOutcome::Ignored;
        };
        if control & TYPE_MASK != TYPE_FRAMEBUFFER {
            #[cfg(feature = "defmt")]
            defmt::debug!("Ignoring USB packet type {=u8:#x}", control & TYPE_MASK);
            self.ignored = self.ignored.wrapping_add(1);
            return PacketOutcome::Ignored;
        }

        let mut pixels = [[0u8; 3]; PIXELS_PER_PACKET];
        let mut count = 0;
        for (slot, chunk) in pixels.iter_mut().zip(payload.chunks_exact(3)) {
            *slot = [chunk[0], chunk[1], chunk[2]];
            count += 1;
        }

        let offset = usize::from(control & INDEX_MASK) * PIXELS_PER_PACKET;
        self.producer.write_pixels(offset, &pixels[..count]);

        if control & FINAL_BIT != 0 {
            PacketOutcome::Published {
                replaced: self.producer.publish(),
            }
        } else {
            PacketOutcome::Partial
        }
    }
}

/// Build a framebuffer packet; used by tests and host tooling
pub fn encode_packet(index: u8, last: bool, pixels: &[WirePixel]) -> [u8; PACKET_SIZE] {
    let mut packet = [0u8; PACKET_SIZE];
    packet[0] = (index & INDEX_MASK) | if last { FINAL_BIT } else { 0 };
    for (chunk, pixel) in packet[1..]
        .chunks_exact_mut(3)
        .zip(pixels.iter().take(PIXELS_PER_PACKET))
    {
        chunk.copy_from_slice(pixel);
    }
    packet
}
