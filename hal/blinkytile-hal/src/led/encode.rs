//! Byte encoders for the clocked and serial LED protocols
//!
//! WS2812 is bit-timed and handled by PIO hardware. The other protocols are
//! plain byte streams, produced here so they can be tested off-target.

use super::Rgb;

/// Maximum DMX slots in one universe (excluding the start code)
pub const DMX_MAX_SLOTS: usize = 512;

/// DMX null start code
pub const DMX_START_CODE: u8 = 0x00;

/// Errors from encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer cannot hold the encoded frame
    BufferTooSmall,
}

/// Scale one channel by an 8-bit brightness level
///
/// A level of 255 leaves the value unchanged.
pub fn scale8(value: u8, level: u8) -> u8 {
    ((value as u16 * (level as u16 + 1)) >> 8) as u8
}

/// Scale a color by an 8-bit brightness level
pub fn scale(color: Rgb, level: u8) -> Rgb {
    Rgb {
        r: scale8(color.r, level),
        g: scale8(color.g, level),
        b: scale8(color.b, level),
    }
}

/// Encoded size of an APA102 frame for `leds` pixels
pub const fn apa102_len(leds: usize) -> usize {
    4 + 4 * leds + leds.div_ceil(16)
}

/// Encoded size of an LPD8806 frame for `leds` pixels
pub const fn lpd8806_len(leds: usize) -> usize {
    3 * leds + leds.div_ceil(32)
}

/// Encoded size of a DMX frame for `leds` pixels
pub const fn dmx_len(leds: usize) -> usize {
    let slots = 3 * leds;
    1 + if slots > DMX_MAX_SLOTS { DMX_MAX_SLOTS } else { slots }
}

/// Encode an APA102 frame
///
/// Brightness is mapped onto the 5-bit per-pixel global field so color
/// resolution is preserved.
pub fn encode_apa102(pixels: &[Rgb], brightness: u8, out: &mut [u8]) -> Result<usize, EncodeError> {
    let len = apa102_len(pixels.len());
    let out = out.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;

    let global = 0xE0 | apa102_global(brightness);
    out[..4].fill(0x00);
    for (chunk, pixel) in out[4..].chunks_exact_mut(4).zip(pixels) {
        chunk.copy_from_slice(&[global, pixel.b, pixel.g, pixel.r]);
    }
    out[4 + 4 * pixels.len()..].fill(0xFF);

    Ok(len)
}

/// 5-bit APA102 global brightness; any nonzero level stays lit
fn apa102_global(brightness: u8) -> u8 {
    match brightness >> 3 {
        0 if brightness > 0 => 1,
        level => level,
    }
}

/// Encode an LPD8806 frame
///
/// Channels go out in (green, red, blue) order with the high bit set,
/// followed by zero latch bytes.
pub fn encode_lpd8806(
    pixels: &[Rgb],
    brightness: u8,
    out: &mut [u8],
) -> Result<usize, EncodeError> {
    let len = lpd8806_len(pixels.len());
    let out = out.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;

    for (chunk, pixel) in out.chunks_exact_mut(3).zip(pixels) {
        let c = scale(*pixel, brightness);
        chunk.copy_from_slice(&[0x80 | (c.g >> 1), 0x80 | (c.r >> 1), 0x80 | (c.b >> 1)]);
    }
    out[3 * pixels.len()..].fill(0x00);

    Ok(len)
}

/// Encode a DMX packet (start code plus slots)
///
/// Slots beyond one universe are dropped. The break and mark-after-break are
/// the transmitter's job.
pub fn encode_dmx(pixels: &[Rgb], brightness: u8, out: &mut [u8]) -> Result<usize, EncodeError> {
    let len = dmx_len(pixels.len());
    let out = out.get_mut(..len).ok_or(EncodeError::BufferTooSmall)?;

    out[0] = DMX_START_CODE;
    let slots = pixels.iter().flat_map(|p| {
        let c = scale(*p, brightness);
        [c.r, c.g, c.b]
    });
    for (slot, value) in out[1..].iter_mut().zip(slots) {
        *slot = value;
    }

    Ok(len)
}
