//! Animation table layout in flash
//!
//! ```text
//! offset 0   magic "BTAN"
//!        4   animation count (u16 LE)
//!        6   LEDs per frame (u16 LE)
//!        8   entries, 12 bytes each:
//!              frame count (u32 LE)
//!              frame period in ms (u32 LE)
//!              data offset from partition start (u32 LE)
//! ```
//!
//! Frame data is `LEDs per frame * 3` bytes per frame, red, green, blue.
//! [`TableStore`] implements [`AnimationStore`] over any [`FlashRead`].

use heapless::Vec;

use super::{AnimationInfo, AnimationStore, StoreError};
use crate::led::Rgb;

/// Table magic
pub const TABLE_MAGIC: [u8; 4] = *b"BTAN";

/// Header size in bytes
pub const HEADER_SIZE: usize = 8;

/// Entry size in bytes
pub const ENTRY_SIZE: usize = 12;

/// Animations kept in the in-memory index
pub const MAX_ANIMATIONS: usize = 32;

/// Bytes read from flash per chunk when copying a frame
const CHUNK_PIXELS: usize = 32;

/// Random-access byte reads from a flash partition
pub trait FlashRead {
    /// Fill `buffer` from `offset` bytes into the partition
    fn read(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Entry {
    info: AnimationInfo,
    offset: u32,
}

/// Animation store backed by a flash table
pub struct TableStore<R> {
    flash: R,
    entries: Vec<Entry, MAX_ANIMATIONS>,
    leds_per_frame: usize,
}

impl<R: FlashRead> TableStore<R> {
    /// Wrap a flash reader. The store is empty until [`AnimationStore::begin`].
    pub fn new(flash: R) -> Self {
        Self {
            flash,
            entries: Vec::new(),
            leds_per_frame: 0,
        }
    }

    pub fn flash_mut(&mut self) -> &mut R {
        &mut self.flash
    }

    fn load(&mut self) -> Result<(), StoreError> {
        let mut header = [0u8; HEADER_SIZE];
        self.flash.read(0, &mut header)?;
        if header[..4] != TABLE_MAGIC {
            return Err(StoreError::NoTable);
        }
        let count = u16::from_le_bytes([header[4], header[5]]) as usize;
        let leds = u16::from_le_bytes([header[6], header[7]]) as usize;

        // Extra entries beyond the index are not reachable
        for index in 0..count.min(MAX_ANIMATIONS) {
            let mut raw = [0u8; ENTRY_SIZE];
            let offset = (HEADER_SIZE + index * ENTRY_SIZE) as u32;
            self.flash.read(offset, &mut raw)?;
            let word =
                |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
            let entry = Entry {
                info: AnimationInfo {
                    frame_count: word(0),
                    speed_ms: word(4),
                },
                offset: word(8),
            };
            // Capacity is bounded by the loop range
            let _ = self.entries.push(entry);
        }
        self.leds_per_frame = leds;
        Ok(())
    }
}

impl<R: FlashRead> AnimationStore for TableStore<R> {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.leds_per_frame = 0;
        let result = self.load();
        if result.is_err() {
            self.entries.clear();
        }
        result
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn animation(&self, index: usize) -> Option<AnimationInfo> {
        self.entries.get(index).map(|entry| entry.info)
    }

    fn read_frame(&mut self, index: usize, frame: u32, dest: &mut [Rgb]) -> Result<(), StoreError> {
        let entry = *self.entries.get(index).ok_or(StoreError::NoSuchAnimation)?;
        if frame >= entry.info.frame_count {
            return Err(StoreError::NoSuchFrame);
        }

        // Offsets come from flash; a corrupt table must not wrap
        let mut offset = u32::try_from(self.leds_per_frame * 3)
            .ok()
            .and_then(|frame_bytes| frame.checked_mul(frame_bytes))
            .and_then(|start| entry.offset.checked_add(start))
            .ok_or(StoreError::Flash)?;
        let stored = self.leds_per_frame.min(dest.len());

        let mut chunk = [0u8; CHUNK_PIXELS * 3];
        for pixels in dest[..stored].chunks_mut(CHUNK_PIXELS) {
            let bytes = &mut chunk[..pixels.len() * 3];
            self.flash.read(offset, bytes)?;
            for (pixel, rgb) in pixels.iter_mut().zip(bytes.chunks_exact(3)) {
                *pixel = Rgb::new(rgb[0], rgb[1], rgb[2]);
            }
            offset = offset
                .checked_add(bytes.len() as u32)
                .ok_or(StoreError::Flash)?;
        }
        dest[stored..].fill(Rgb::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;
    use std::vec::Vec as StdVec;

    struct SliceFlash(StdVec<u8>);

    impl FlashRead for SliceFlash {
        fn read(&mut self, offset: u32, buffer: &mut [u8]) -> Result<(), StoreError> {
            let start = offset as usize;
            let bytes = self
                .0
                .get(start..start + buffer.len())
                .ok_or(StoreError::Flash)?;
            buffer.copy_from_slice(bytes);
            Ok(())
        }
    }

    /// Two animations over 2 LEDs: 2 frames at 50ms, 1 frame at 200ms
    fn image() -> StdVec<u8> {
        let mut image = vec![];
        image.extend_from_slice(&TABLE_MAGIC);
        image.extend_from_slice(&2u16.to_le_bytes());
        image.extend_from_slice(&2u16.to_le_bytes());
        let data = (HEADER_SIZE + 2 * ENTRY_SIZE) as u32;
        for (frames, speed, offset) in [(2u32, 50u32, data), (1, 200, data + 12)] {
            image.extend_from_slice(&frames.to_le_bytes());
            image.extend_from_slice(&speed.to_le_bytes());
            image.extend_from_slice(&offset.to_le_bytes());
        }
        image.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        image.extend_from_slice(&[7, 8, 9, 10, 11, 12]);
        image.extend_from_slice(&[20, 21, 22, 23, 24, 25]);
        image
    }

    #[test]
    fn test_empty_until_begin() {
        let store = TableStore::new(SliceFlash(image()));
        assert_eq!(store.count(), 0);
        assert_eq!(store.animation(0), None);
    }

    #[test]
    fn test_reads_table_and_frames() {
        let mut store = TableStore::new(SliceFlash(image()));
        store.begin().unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(
            store.animation(1),
            Some(AnimationInfo {
                frame_count: 1,
                speed_ms: 200
            })
        );

        let mut frame = [Rgb::default(); 2];
        store.read_frame(0, 1, &mut frame).unwrap();
        assert_eq!(frame, [Rgb::new(7, 8, 9), Rgb::new(10, 11, 12)]);

        store.read_frame(1, 0, &mut frame).unwrap();
        assert_eq!(frame[1], Rgb::new(23, 24, 25));
    }

    #[test]
    fn test_longer_strip_is_blanked_past_stored_leds() {
        let mut store = TableStore::new(SliceFlash(image()));
        store.begin().unwrap();

        let mut frame = [Rgb::new(9, 9, 9); 3];
        store.read_frame(0, 0, &mut frame).unwrap();
        assert_eq!(frame[2], Rgb::default());
    }

    #[test]
    fn test_bad_magic_leaves_store_empty() {
        let mut image = image();
        image[0] = b'X';
        let mut store = TableStore::new(SliceFlash(image));
        assert_eq!(store.begin(), Err(StoreError::NoTable));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_frame_bounds() {
        let mut store = TableStore::new(SliceFlash(image()));
        store.begin().unwrap();
        let mut frame = [Rgb::default(); 2];
        assert_eq!(store.read_frame(0, 2, &mut frame), Err(StoreError::NoSuchFrame));
        assert_eq!(
            store.read_frame(5, 0, &mut frame),
            Err(StoreError::NoSuchAnimation)
        );
    }

    #[test]
    fn test_huge_frame_offset_is_an_error() {
        let mut image = vec![];
        image.extend_from_slice(&TABLE_MAGIC);
        image.extend_from_slice(&1u16.to_le_bytes());
        image.extend_from_slice(&160u16.to_le_bytes());
        image.extend_from_slice(&10_000_000u32.to_le_bytes());
        image.extend_from_slice(&20u32.to_le_bytes());
        image.extend_from_slice(&((HEADER_SIZE + ENTRY_SIZE) as u32).to_le_bytes());
        let mut store = TableStore::new(SliceFlash(image));
        store.begin().unwrap();

        let mut frame = [Rgb::default(); 160];
        assert_eq!(
            store.read_frame(0, 9_000_000, &mut frame),
            Err(StoreError::Flash)
        );
    }

    #[test]
    fn test_data_offset_near_end_of_address_space() {
        let mut image = image();
        let at = HEADER_SIZE + 8;
        image[at..at + 4].copy_from_slice(&(u32::MAX - 2).to_le_bytes());
        let mut store = TableStore::new(SliceFlash(image));
        store.begin().unwrap();

        let mut frame = [Rgb::default(); 2];
        assert_eq!(store.read_frame(0, 1, &mut frame), Err(StoreError::Flash));
    }

    #[test]
    fn test_truncated_flash_is_an_error() {
        let mut image = image();
        image.truncate(HEADER_SIZE + 4);
        let mut store = TableStore::new(SliceFlash(image));
        assert_eq!(store.begin(), Err(StoreError::Flash));
        assert_eq!(store.count(), 0);
    }
}
